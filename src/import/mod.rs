//! Bulk import pipeline.
//!
//! Uploaded CSV rows are reconciled one by one against the metadata provider,
//! merged with the row's own values and written to the catalog store.

pub mod merge;
pub mod normalizer;
pub mod orchestrator;
pub mod parser;
pub mod preflight;
pub mod selector;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    models::{Game, ImportStatus, MergedRecord, PreflightResult},
    provider::ProviderError,
};

pub use merge::{merge, MergeDefaults, MergeRejected, Merged};
pub use orchestrator::ImportOrchestrator;
pub use parser::{parse_upload, ParseError, ParsedUpload};
pub use preflight::{preflight, PreflightChecks};
pub use selector::{select_best_candidate, MatchKind};

/// Failures that end a session before any row is touched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("provider preflight failed ({}): {}", .0.classification, .0.detail)]
    Preflight(PreflightResult),

    #[error("cannot {action} an import session in state '{status}'")]
    InvalidState {
        action: &'static str,
        status: ImportStatus,
    },
}

/// Failures local to one row; logged and skipped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("no identity")]
    NoIdentity,

    #[error("not found in provider")]
    NotFoundInProvider,

    #[error("provider error: {0}")]
    ProviderFailed(ProviderError),

    #[error("merge rejected: {0}")]
    MergeRejected(MergeRejected),

    #[error("store rejected: {0}")]
    StoreRejected(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Write failures reported by the catalog store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store refused the record (e.g. duplicate name)
    #[error("{reason}")]
    Rejected { reason: String },

    #[error("{0}")]
    Unavailable(String),
}

impl From<StoreError> for RecordError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected { reason } => RecordError::StoreRejected(reason),
            StoreError::Unavailable(message) => RecordError::StoreUnavailable(message),
        }
    }
}

/// Catalog persistence as seen by the importer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_record(&self, record: &MergedRecord) -> Result<Game, StoreError>;
}
