//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{games, health, imports, provider};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gameshelf API",
        version = "1.0.0",
        description = "Personal game catalog REST API with bulk CSV import",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Games
        games::list_games,
        games::get_game,
        games::create_game,
        games::delete_game,
        // Imports
        imports::upload,
        imports::start,
        imports::status,
        imports::events,
        imports::cancel,
        imports::reset,
        // Provider
        provider::preflight,
    ),
    components(
        schemas(
            // Games
            crate::models::Game,
            crate::models::GameShort,
            crate::models::GameQuery,
            crate::models::CreateGame,
            crate::models::MergedRecord,
            games::PaginatedGames,
            // Imports
            crate::models::ImportSession,
            crate::models::ImportStatus,
            crate::models::ImportSummary,
            crate::models::LogEntry,
            crate::models::LogOutcome,
            crate::models::PreflightResult,
            crate::models::PreflightClassification,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Game catalog"),
        (name = "imports", description = "Bulk CSV import"),
        (name = "provider", description = "Metadata provider diagnostics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
