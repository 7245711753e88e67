//! Games domain methods on Repository

use sqlx::{Postgres, QueryBuilder};

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{Game, GameQuery, GameShort, MergedRecord},
};

pub const DEFAULT_PER_PAGE: i64 = 50;
pub const MAX_PER_PAGE: i64 = 500;

/// Effective pagination of a list query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
    pub offset: i64,
}

impl PageWindow {
    pub fn from_query(query: &GameQuery) -> Self {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        Self {
            page,
            per_page,
            offset: (page - 1).saturating_mul(per_page),
        }
    }
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a GameQuery) {
    builder.push(" WHERE 1=1");

    if let Some(ref name) = query.name {
        builder
            .push(" AND LOWER(name) LIKE ")
            .push_bind(format!("%{}%", name.trim().to_lowercase()));
    }

    if let Some(ref platform) = query.platform {
        builder
            .push(" AND EXISTS (SELECT 1 FROM unnest(platforms) p WHERE LOWER(p) = LOWER(")
            .push_bind(platform.trim())
            .push("))");
    }

    if let Some(ref genre) = query.genre {
        builder
            .push(" AND EXISTS (SELECT 1 FROM unnest(genres) g WHERE LOWER(g) = LOWER(")
            .push_bind(genre.trim())
            .push("))");
    }

    if let Some(ref status) = query.status {
        builder
            .push(" AND LOWER(status) = LOWER(")
            .push_bind(status.trim())
            .push(")");
    }

    if let Some(completed) = query.completed {
        builder.push(" AND completed = ").push_bind(completed);
    }
}

impl Repository {
    /// List games with filters and pagination, ordered by name
    pub async fn games_list(&self, query: &GameQuery) -> AppResult<(Vec<GameShort>, i64)> {
        let window = PageWindow::from_query(query);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM games");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(
            "SELECT id, name, platforms, cover_url, release_date, score, completed, status FROM games",
        );
        push_filters(&mut select, query);
        select
            .push(" ORDER BY LOWER(name) LIMIT ")
            .push_bind(window.per_page)
            .push(" OFFSET ")
            .push_bind(window.offset);

        let games = select
            .build_query_as::<GameShort>()
            .fetch_all(&self.pool)
            .await?;

        Ok((games, total))
    }

    /// Get game by ID
    pub async fn games_get_by_id(&self, id: i32) -> AppResult<Game> {
        sqlx::query_as::<_, Game>("SELECT * FROM games WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game {} not found", id)))
    }

    /// Case-insensitive name lookup, used for duplicate checks
    pub async fn games_name_exists(&self, name: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM games WHERE LOWER(name) = LOWER($1))")
                .bind(name.trim())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Insert a game. A name collision surfaces as `AppError::Conflict`.
    pub async fn games_create(&self, record: &MergedRecord) -> AppResult<Game> {
        sqlx::query_as::<_, Game>(
            r#"
            INSERT INTO games (name, platforms, media_types, cover_url, release_date, score,
                               genres, publishers, description, completed, status, external_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(&record.name)
        .bind(&record.platforms)
        .bind(&record.media_types)
        .bind(&record.cover_url)
        .bind(record.release_date)
        .bind(record.score)
        .bind(&record.genres)
        .bind(&record.publishers)
        .bind(&record.description)
        .bind(record.completed)
        .bind(&record.status)
        .bind(record.external_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(
                format!("A game named '{}' already exists", record.name),
            ),
            other => AppError::Database(other),
        })
    }

    /// Delete a game
    pub async fn games_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Game {} not found", id)));
        }
        Ok(())
    }
}
