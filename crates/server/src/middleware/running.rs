use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::ApiError, state::AppState};

/// Gate for the agent routes: answers 503 while the owner has the agent
/// shut down.
pub async fn require_running(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.switch.is_shut_down() {
        return ApiError::ShutDown.into_response();
    }
    next.run(request).await
}
