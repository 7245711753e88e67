//! API handlers for Gameshelf REST endpoints

pub mod games;
pub mod health;
pub mod imports;
pub mod openapi;
pub mod provider;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// API v1 routes, mounted under `/api/v1`
pub fn routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/games", get(games::list_games).post(games::create_game))
        .route("/games/:id", get(games::get_game).delete(games::delete_game))
        // Bulk import
        .route(
            "/imports",
            get(imports::status).post(imports::upload).delete(imports::reset),
        )
        .route("/imports/start", post(imports::start))
        .route("/imports/cancel", post(imports::cancel))
        .route("/imports/events", get(imports::events))
        // Provider diagnostics
        .route("/provider/preflight", get(provider::preflight))
        .with_state(state)
}
