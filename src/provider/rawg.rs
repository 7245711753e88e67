//! RAWG-compatible HTTP provider client.
//!
//! Requests are rate limited to one per configured interval and every transport failure is
//! mapped to a [`ProviderError`] variant.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};

use super::{ProviderClient, ProviderError};
use crate::{
    config::ProviderConfig,
    error::{AppError, AppResult},
    models::{ProviderCandidate, ProviderDetails},
};

const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Deserialize)]
struct RawgListResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawgIdName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawgPlatformEntry {
    platform: RawgIdName,
}

#[derive(Debug, Deserialize)]
struct RawgGameRow {
    id: i64,
    name: String,
    released: Option<String>,
    metacritic: Option<i32>,
    background_image: Option<String>,
    platforms: Option<Vec<RawgPlatformEntry>>,
    genres: Option<Vec<RawgIdName>>,
}

#[derive(Debug, Deserialize)]
struct RawgGameDetail {
    id: i64,
    description_raw: Option<String>,
    publishers: Option<Vec<RawgIdName>>,
    genres: Option<Vec<RawgIdName>>,
}

impl From<RawgGameRow> for ProviderCandidate {
    fn from(row: RawgGameRow) -> Self {
        Self {
            external_id: row.id,
            name: row.name,
            release_date: row
                .released
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            score: row.metacritic,
            platform_names: names(row.platforms.map(|p| p.into_iter().map(|e| e.platform).collect())),
            genre_names: names(row.genres),
            cover_url: row.background_image.filter(|u| !u.is_empty()),
        }
    }
}

impl From<RawgGameDetail> for ProviderDetails {
    fn from(detail: RawgGameDetail) -> Self {
        Self {
            external_id: detail.id,
            description: detail.description_raw.unwrap_or_default().trim().to_string(),
            publisher_names: names(detail.publishers),
            genre_names: names(detail.genres),
        }
    }
}

fn names(entries: Option<Vec<RawgIdName>>) -> Vec<String> {
    entries
        .unwrap_or_default()
        .into_iter()
        .map(|e| e.name)
        .collect()
}

/// One request per `min_interval`; `None` when the interval is zero
fn request_limiter(min_interval: Duration) -> Option<DefaultDirectRateLimiter> {
    Quota::with_period(min_interval).map(RateLimiter::direct)
}

pub struct RawgClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    page_size: u32,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl RawgClient {
    pub fn new(config: &ProviderConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("gameshelf-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build provider HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            tracing::warn!("No provider API key configured; requests may be refused");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            page_size: config.search_page_size.max(1),
            limiter: request_limiter(Duration::from_millis(config.min_request_interval_ms)),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        if let Some(ref limiter) = self.limiter {
            limiter.until_ready().await;
        }

        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("Provider request: GET {}", url);

        let mut request = self.client.get(&url).query(params);
        if let Some(ref key) = self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = body.chars().take(MAX_ERROR_BODY).collect::<String>();
            return Err(status_error(status, message));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Decode(e.to_string())
            }
        })
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else if let Some(status) = e.status() {
        status_error(status, e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

fn status_error(status: StatusCode, message: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Blocked {
            status: status.as_u16(),
            message,
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ProviderError::Timeout(format!("HTTP {}", status.as_u16()))
        }
        _ => ProviderError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl ProviderClient for RawgClient {
    async fn search(&self, query: &str) -> Result<Vec<ProviderCandidate>, ProviderError> {
        let params = [
            ("search", query.trim().to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        let response: RawgListResponse<RawgGameRow> = self.get_json("games", &params).await?;
        Ok(response.results.into_iter().map(ProviderCandidate::from).collect())
    }

    async fn details(&self, external_id: i64) -> Result<ProviderDetails, ProviderError> {
        let detail: RawgGameDetail = self
            .get_json(&format!("games/{}", external_id), &[])
            .await?;
        Ok(detail.into())
    }
}
