//! Bulk import session models: uploaded rows, per-record log and session snapshot.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Columns the importer understands. Any other column is carried but ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Name,
    Platforms,
    MediaTypes,
    Metacritic,
    Released,
    Genres,
    Publishers,
    Description,
    CoverUrl,
    Completed,
}

impl RecordField {
    pub const ALL: [RecordField; 10] = [
        RecordField::Name,
        RecordField::Platforms,
        RecordField::MediaTypes,
        RecordField::Metacritic,
        RecordField::Released,
        RecordField::Genres,
        RecordField::Publishers,
        RecordField::Description,
        RecordField::CoverUrl,
        RecordField::Completed,
    ];

    /// Column header as declared in upload files
    pub fn header(&self) -> &'static str {
        match self {
            RecordField::Name => "name",
            RecordField::Platforms => "platforms",
            RecordField::MediaTypes => "mediaTypes",
            RecordField::Metacritic => "metacritic",
            RecordField::Released => "released",
            RecordField::Genres => "genres",
            RecordField::Publishers => "publishers",
            RecordField::Description => "description",
            RecordField::CoverUrl => "coverUrl",
            RecordField::Completed => "completed",
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.header().eq_ignore_ascii_case(header))
    }
}

/// One uploaded row: column name to raw value, in file column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadedRecord {
    values: IndexMap<String, String>,
}

impl UploadedRecord {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Trimmed value of a recognized column; `None` when absent or blank.
    pub fn get(&self, field: RecordField) -> Option<&str> {
        self.values
            .iter()
            .filter(|(column, _)| RecordField::from_header(column) == Some(field))
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.get(RecordField::Name)
    }

    /// Label used in the import log
    pub fn label(&self, row: usize) -> String {
        self.name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Row {}", row))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of one processed record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogOutcome {
    Success,
    Warning,
    Error,
}

/// One line of the import log
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct LogEntry {
    /// 1-based data row in the uploaded file
    pub row: usize,
    pub record_label: String,
    pub outcome: LogOutcome,
    pub message: String,
}

/// Import session lifecycle. Sessions only move forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Idle,
    Parsed,
    PreflightRunning,
    PreflightFailed,
    Importing,
    Completed,
}

impl ImportStatus {
    /// Whether a worker currently owns the session
    pub fn is_running(&self) -> bool {
        matches!(self, ImportStatus::PreflightRunning | ImportStatus::Importing)
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ImportStatus::Idle => "idle",
            ImportStatus::Parsed => "parsed",
            ImportStatus::PreflightRunning => "preflight_running",
            ImportStatus::PreflightFailed => "preflight_failed",
            ImportStatus::Importing => "importing",
            ImportStatus::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

/// Provider reachability classes, in the order they are checked
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PreflightClassification {
    CrossOriginBlocked,
    NoResults,
    NetworkError,
    Ok,
}

impl std::fmt::Display for PreflightClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PreflightClassification::CrossOriginBlocked => "cross_origin_blocked",
            PreflightClassification::NoResults => "no_results",
            PreflightClassification::NetworkError => "network_error",
            PreflightClassification::Ok => "ok",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of the connectivity preflight
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PreflightResult {
    pub ok: bool,
    pub classification: PreflightClassification,
    pub detail: String,
    /// Remediation hint for the operator
    pub hint: String,
}

/// Snapshot of an import session, published after every record boundary
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportSession {
    pub id: Uuid,
    pub status: ImportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Columns declared by the uploaded file
    #[serde(default)]
    pub fields: Vec<String>,
    pub total: usize,
    pub processed: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Set when the operator stopped the run before the last record
    #[serde(default)]
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preflight: Option<PreflightResult>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: ImportStatus::Idle,
            file_name: None,
            fields: Vec::new(),
            total: 0,
            processed: 0,
            success_count: 0,
            failure_count: 0,
            cancelled: false,
            error: None,
            preflight: None,
            log: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            total: self.total,
            success_count: self.success_count,
            failure_count: self.failure_count,
            cancelled: self.cancelled,
            log: self.log.clone(),
        }
    }
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal summary of a completed session
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ImportSummary {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub cancelled: bool,
    pub log: Vec<LogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_match_case_insensitively() {
        assert_eq!(RecordField::from_header(" MediaTypes "), Some(RecordField::MediaTypes));
        assert_eq!(RecordField::from_header("coverurl"), Some(RecordField::CoverUrl));
        assert_eq!(RecordField::from_header("rating"), None);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let record = UploadedRecord::from_pairs([("Name", "  "), ("genres", " RPG ")]);
        assert_eq!(record.name(), None);
        assert_eq!(record.get(RecordField::Genres), Some("RPG"));
        assert_eq!(record.label(4), "Row 4");
    }
}
