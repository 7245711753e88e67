//! Data models for Gameshelf

pub mod game;
pub mod import_session;
pub mod provider;

// Re-export commonly used types
pub use game::{CreateGame, Game, GameQuery, GameShort, MergedRecord};
pub use import_session::{
    ImportSession, ImportStatus, ImportSummary, LogEntry, LogOutcome, PreflightClassification,
    PreflightResult, RecordField, UploadedRecord,
};
pub use provider::{ProviderCandidate, ProviderDetails};
