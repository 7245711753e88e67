//! Game (catalog entry) model and related types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::import::normalizer::is_completed_status;

/// Status label that marks an entry as finished
pub const COMPLETED_STATUS: &str = "Completed";

/// Persistable catalog entry, produced by the import merge or by manual entry.
///
/// `name`, `platforms` and `media_types` are never empty for a record that
/// reaches the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct MergedRecord {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "at least one platform is required"))]
    pub platforms: Vec<String>,
    #[validate(length(min = 1, message = "at least one media type is required"))]
    pub media_types: Vec<String>,
    #[serde(default)]
    pub cover_url: String,
    pub release_date: Option<NaiveDate>,
    #[validate(range(min = 0, max = 100))]
    pub score: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub status: String,
    /// Provider identifier the entry was reconciled against
    #[serde(default)]
    pub external_id: Option<i64>,
}

impl MergedRecord {
    /// Completion is derived from the status label, never set on its own.
    pub fn sync_completion(&mut self) {
        self.completed = is_completed_status(&self.status);
    }
}

/// Stored catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Game {
    pub id: i32,
    pub name: String,
    pub platforms: Vec<String>,
    pub media_types: Vec<String>,
    pub cover_url: String,
    pub release_date: Option<NaiveDate>,
    pub score: Option<i32>,
    pub genres: Vec<String>,
    pub publishers: Vec<String>,
    pub description: String,
    pub completed: bool,
    pub status: String,
    pub external_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short game representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct GameShort {
    pub id: i32,
    pub name: String,
    pub platforms: Vec<String>,
    pub cover_url: String,
    pub release_date: Option<NaiveDate>,
    pub score: Option<i32>,
    pub completed: bool,
    pub status: String,
}

/// Manual entry payload for `POST /games`
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateGame {
    pub name: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub media_types: Vec<String>,
    pub cover_url: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub score: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    pub description: Option<String>,
    /// Defaults to the configured import status label
    pub status: Option<String>,
}

/// Game list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct GameQuery {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    pub platform: Option<String>,
    pub genre: Option<String>,
    pub status: Option<String>,
    pub completed: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
