//! Metadata provider data shapes, independent of the wire format.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lightweight search hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProviderCandidate {
    pub external_id: i64,
    pub name: String,
    pub release_date: Option<NaiveDate>,
    pub score: Option<i32>,
    #[serde(default)]
    pub platform_names: Vec<String>,
    #[serde(default)]
    pub genre_names: Vec<String>,
    pub cover_url: Option<String>,
}

/// Full metadata, fetched only for the selected candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProviderDetails {
    pub external_id: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub publisher_names: Vec<String>,
    #[serde(default)]
    pub genre_names: Vec<String>,
}
