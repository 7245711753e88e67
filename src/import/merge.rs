//! Merge of an uploaded row with provider metadata.
//!
//! Precedence: a present, non-empty uploaded value always wins; otherwise the
//! provider value is used; otherwise the field default.

use thiserror::Error;

use super::normalizer::{
    normalize_platforms, normalize_status, parse_release_date, parse_score, split_list,
};
use crate::{
    config::ImportConfig,
    models::{MergedRecord, ProviderCandidate, ProviderDetails, RecordField, UploadedRecord},
};

/// Why a row cannot become a catalog entry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeRejected {
    #[error("no identity")]
    NoIdentity,
    #[error("no platforms")]
    NoPlatforms,
    #[error("no media type")]
    NoMediaTypes,
}

/// Fallbacks for fields neither the row nor the provider supply
#[derive(Debug, Clone)]
pub struct MergeDefaults {
    pub media_type: String,
    pub status: String,
}

impl From<&ImportConfig> for MergeDefaults {
    fn from(config: &ImportConfig) -> Self {
        Self {
            media_type: config.default_media_type.clone(),
            status: config.default_status.clone(),
        }
    }
}

impl Default for MergeDefaults {
    fn default() -> Self {
        Self::from(&ImportConfig::default())
    }
}

/// A merged record plus non-fatal notes about ignored input
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub record: MergedRecord,
    pub warnings: Vec<String>,
}

fn uploaded_list(
    uploaded: &UploadedRecord,
    field: RecordField,
    split: fn(&str) -> Vec<String>,
) -> Option<Vec<String>> {
    uploaded
        .get(field)
        .map(split)
        .filter(|values| !values.is_empty())
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

pub fn merge(
    uploaded: &UploadedRecord,
    details: Option<&ProviderDetails>,
    candidate: Option<&ProviderCandidate>,
    defaults: &MergeDefaults,
) -> Result<Merged, MergeRejected> {
    let mut warnings = Vec::new();

    let name = uploaded
        .name()
        .map(str::to_string)
        .or_else(|| candidate.map(|c| c.name.trim().to_string()))
        .filter(|n| !n.is_empty())
        .ok_or(MergeRejected::NoIdentity)?;

    // Uploaded platforms go through alias normalization; provider names are
    // already canonical.
    let platforms = uploaded_list(uploaded, RecordField::Platforms, normalize_platforms)
        .or_else(|| candidate.and_then(|c| non_empty(&c.platform_names)))
        .ok_or(MergeRejected::NoPlatforms)?;

    let media_types = uploaded_list(uploaded, RecordField::MediaTypes, split_list)
        .or_else(|| non_empty(&split_list(&defaults.media_type)))
        .ok_or(MergeRejected::NoMediaTypes)?;

    let genres = uploaded_list(uploaded, RecordField::Genres, split_list)
        .or_else(|| details.and_then(|d| non_empty(&d.genre_names)))
        .or_else(|| candidate.and_then(|c| non_empty(&c.genre_names)))
        .unwrap_or_default();

    let publishers = uploaded_list(uploaded, RecordField::Publishers, split_list)
        .or_else(|| details.and_then(|d| non_empty(&d.publisher_names)))
        .unwrap_or_default();

    let description = uploaded
        .get(RecordField::Description)
        .map(str::to_string)
        .or_else(|| details.map(|d| d.description.clone()))
        .unwrap_or_default();

    let cover_url = uploaded
        .get(RecordField::CoverUrl)
        .map(str::to_string)
        .or_else(|| candidate.and_then(|c| c.cover_url.clone()))
        .unwrap_or_default();

    let score = match uploaded.get(RecordField::Metacritic) {
        Some(raw) => parse_score(raw).or_else(|| {
            warnings.push(format!("ignored invalid metacritic score '{}'", raw));
            candidate.and_then(|c| c.score)
        }),
        None => candidate.and_then(|c| c.score),
    };

    let release_date = match uploaded.get(RecordField::Released) {
        Some(raw) => parse_release_date(raw).or_else(|| {
            warnings.push(format!("ignored invalid release date '{}'", raw));
            candidate.and_then(|c| c.release_date)
        }),
        None => candidate.and_then(|c| c.release_date),
    };

    let status = uploaded
        .get(RecordField::Completed)
        .and_then(normalize_status)
        .or_else(|| normalize_status(&defaults.status))
        .unwrap_or_default();

    let mut record = MergedRecord {
        name,
        platforms,
        media_types,
        cover_url,
        release_date,
        score,
        genres,
        publishers,
        description,
        completed: false,
        status,
        external_id: candidate
            .map(|c| c.external_id)
            .or_else(|| details.map(|d| d.external_id)),
    };
    record.sync_completion();

    Ok(Merged { record, warnings })
}
