//! Metadata provider client contract.
//!
//! The import pipeline only depends on [`ProviderClient`]; [`rawg::RawgClient`]
//! is the HTTP implementation used by the server.

pub mod rawg;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ProviderCandidate, ProviderDetails};

pub use rawg::RawgClient;

/// Failure shapes a provider client reports. Preflight classification matches
/// on these variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider (or a proxy in front of it) refused requests from this origin.
    #[error("request blocked by provider (HTTP {status}): {message}")]
    Blocked { status: u16, message: String },

    #[error("provider request timed out: {0}")]
    Timeout(String),

    #[error("provider unreachable: {0}")]
    Network(String),

    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected provider response: {0}")]
    Decode(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Search candidates by name, ranked by the provider's relevance order.
    async fn search(&self, query: &str) -> Result<Vec<ProviderCandidate>, ProviderError>;

    /// Fetch full metadata for one candidate.
    async fn details(&self, external_id: i64) -> Result<ProviderDetails, ProviderError>;
}
