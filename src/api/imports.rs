//! Bulk import endpoints

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use axum_extra::extract::Multipart;
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};

use crate::{
    error::{AppError, AppResult},
    models::ImportSession,
};

const UPLOAD_FIELD: &str = "file";

/// Upload a CSV file and parse it into a new import session
#[utoipa::path(
    post,
    path = "/imports",
    tag = "imports",
    request_body(content = String, content_type = "multipart/form-data", description = "CSV file in the `file` field"),
    responses(
        (status = 200, description = "Parsed session", body = ImportSession),
        (status = 400, description = "Empty or malformed upload", body = crate::error::ErrorResponse),
        (status = 409, description = "An import is running", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload(
    State(state): State<crate::AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ImportSession>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        tracing::info!(
            "Import upload received: {} ({} bytes)",
            file_name.as_deref().unwrap_or("unnamed"),
            bytes.len()
        );
        let session = state.services.imports.upload(file_name, &bytes).await?;
        return Ok(Json(session));
    }

    Err(AppError::Upload(format!("missing multipart field '{}'", UPLOAD_FIELD)))
}

/// Start processing the parsed session
#[utoipa::path(
    post,
    path = "/imports/start",
    tag = "imports",
    responses(
        (status = 202, description = "Import started", body = ImportSession),
        (status = 409, description = "Session is not in the Parsed state", body = crate::error::ErrorResponse)
    )
)]
pub async fn start(
    State(state): State<crate::AppState>,
) -> AppResult<(axum::http::StatusCode, Json<ImportSession>)> {
    let session = state.services.imports.start().await?;
    Ok((axum::http::StatusCode::ACCEPTED, Json(session)))
}

/// Current import session snapshot
#[utoipa::path(
    get,
    path = "/imports",
    tag = "imports",
    responses(
        (status = 200, description = "Current session", body = ImportSession)
    )
)]
pub async fn status(State(state): State<crate::AppState>) -> Json<ImportSession> {
    Json(state.services.imports.status().await)
}

/// Stream session snapshots as Server-Sent Events, one per record boundary
#[utoipa::path(
    get,
    path = "/imports/events",
    tag = "imports",
    responses(
        (status = 200, description = "text/event-stream of `session` events carrying ImportSession JSON")
    )
)]
pub async fn events(
    State(state): State<crate::AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("New import SSE client connected");

    let rx = state.services.imports.subscribe().await;
    let stream = WatchStream::new(rx).filter_map(|session| {
        match Event::default().event("session").json_data(&session) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!("Failed to serialize import snapshot: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Request cancellation of the running import
#[utoipa::path(
    post,
    path = "/imports/cancel",
    tag = "imports",
    responses(
        (status = 200, description = "Cancellation requested", body = ImportSession),
        (status = 409, description = "No import is running", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel(State(state): State<crate::AppState>) -> AppResult<Json<ImportSession>> {
    Ok(Json(state.services.imports.cancel().await?))
}

/// Discard the current session
#[utoipa::path(
    delete,
    path = "/imports",
    tag = "imports",
    responses(
        (status = 200, description = "Fresh idle session", body = ImportSession),
        (status = 409, description = "An import is running", body = crate::error::ErrorResponse)
    )
)]
pub async fn reset(State(state): State<crate::AppState>) -> AppResult<Json<ImportSession>> {
    Ok(Json(state.services.imports.reset().await?))
}
