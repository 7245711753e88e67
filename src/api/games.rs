//! Game catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{CreateGame, Game, GameQuery, GameShort},
    repository::games::PageWindow,
};

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
#[aliases(PaginatedGames = PaginatedResponse<GameShort>)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// List of games
    pub items: Vec<T>,
    /// Total number of matching games
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Games per page
    pub per_page: i64,
}

/// List games with filters and pagination
#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    params(GameQuery),
    responses(
        (status = 200, description = "List of games", body = PaginatedGames)
    )
)]
pub async fn list_games(
    State(state): State<crate::AppState>,
    Query(query): Query<GameQuery>,
) -> AppResult<Json<PaginatedResponse<GameShort>>> {
    let (items, total) = state.services.catalog.list_games(&query).await?;
    let window = PageWindow::from_query(&query);

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: window.page,
        per_page: window.per_page,
    }))
}

/// Get game details by ID
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "games",
    params(
        ("id" = i32, Path, description = "Game ID")
    ),
    responses(
        (status = 200, description = "Game details", body = Game),
        (status = 404, description = "Game not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_game(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Game>> {
    let game = state.services.catalog.get_game(id).await?;
    Ok(Json(game))
}

/// Manually add a game
#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    request_body = CreateGame,
    responses(
        (status = 201, description = "Game created", body = Game),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "A game with this name already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_game(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateGame>,
) -> AppResult<(StatusCode, Json<Game>)> {
    let created = state.services.catalog.create_game(data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Delete a game
#[utoipa::path(
    delete,
    path = "/games/{id}",
    tag = "games",
    params(
        ("id" = i32, Path, description = "Game ID")
    ),
    responses(
        (status = 204, description = "Game deleted"),
        (status = 404, description = "Game not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_game(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_game(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
