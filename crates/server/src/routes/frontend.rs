use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use services::services::storage::StorageError;

use crate::state::AppState;

/// Serve `index.html` from the app root verbatim, re-read on every request
/// so a self-edit shows up without a restart.
pub async fn serve_index(State(state): State<AppState>) -> Response {
    let path = state.config.index_path();
    match state.storage.read(&path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            bytes,
        )
            .into_response(),
        Err(StorageError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "index.html not found").into_response()
        }
        Err(e) => {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "index.html could not be read").into_response()
        }
    }
}
