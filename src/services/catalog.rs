//! Catalog management service

use async_trait::async_trait;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    import::{
        normalizer::{normalize_platforms, normalize_status, split_list},
        CatalogStore, MergeDefaults, StoreError,
    },
    models::{CreateGame, Game, GameQuery, GameShort, MergedRecord},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    defaults: MergeDefaults,
}

impl CatalogService {
    pub fn new(repository: Repository, defaults: MergeDefaults) -> Self {
        Self { repository, defaults }
    }

    /// List games with filters
    pub async fn list_games(&self, query: &GameQuery) -> AppResult<(Vec<GameShort>, i64)> {
        self.repository.games_list(query).await
    }

    pub async fn get_game(&self, id: i32) -> AppResult<Game> {
        self.repository.games_get_by_id(id).await
    }

    /// Manual entry. Runs the same normalization and invariants as an import.
    pub async fn create_game(&self, data: CreateGame) -> AppResult<Game> {
        let record = manual_record(data, &self.defaults);
        self.insert(&record).await
    }

    pub async fn delete_game(&self, id: i32) -> AppResult<()> {
        self.repository.games_delete(id).await
    }

    /// Database reachability, used by the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }

    async fn insert(&self, record: &MergedRecord) -> AppResult<Game> {
        record
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self.repository.games_name_exists(&record.name).await? {
            return Err(AppError::Conflict(format!(
                "A game named '{}' already exists",
                record.name
            )));
        }

        let game = self.repository.games_create(record).await?;
        tracing::info!(id = game.id, "Game created: {}", game.name);
        Ok(game)
    }
}

fn manual_record(data: CreateGame, defaults: &MergeDefaults) -> MergedRecord {
    let mut media_types = split_list(&data.media_types.join(","));
    if media_types.is_empty() && !defaults.media_type.trim().is_empty() {
        media_types.push(defaults.media_type.trim().to_string());
    }

    let status = data
        .status
        .as_deref()
        .and_then(normalize_status)
        .or_else(|| normalize_status(&defaults.status))
        .unwrap_or_default();

    let mut record = MergedRecord {
        name: data.name.trim().to_string(),
        platforms: normalize_platforms(&data.platforms.join(",")),
        media_types,
        cover_url: data.cover_url.unwrap_or_default().trim().to_string(),
        release_date: data.release_date,
        score: data.score,
        genres: split_list(&data.genres.join(",")),
        publishers: split_list(&data.publishers.join(",")),
        description: data.description.unwrap_or_default().trim().to_string(),
        completed: false,
        status,
        external_id: None,
    };
    record.sync_completion();
    record
}

#[async_trait]
impl CatalogStore for CatalogService {
    async fn create_record(&self, record: &MergedRecord) -> Result<Game, StoreError> {
        self.insert(record).await.map_err(|e| match e {
            AppError::Conflict(reason) | AppError::Validation(reason) => {
                StoreError::Rejected { reason }
            }
            other => StoreError::Unavailable(other.to_string()),
        })
    }
}
