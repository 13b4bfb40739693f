use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;

use crate::{error::ApiError, middleware as app_middleware, state::AppState};

pub mod chat;
pub mod fetch;
pub mod frontend;
pub mod health;
pub mod owner;
pub mod task;
pub mod voice;

/// Cap for JSON bodies on every route.
pub const JSON_BODY_LIMIT: usize = 4 * 1024 * 1024;
/// Cap for the multipart audio upload on `/api/stt`.
pub const UPLOAD_BODY_LIMIT: usize = 100 * 1024 * 1024;

async fn not_found() -> impl IntoResponse {
    ApiError::NotFound
}

pub fn router(state: AppState) -> Router {
    // Everything the owner can switch off; owner routes stay reachable.
    let agent_routes = Router::new()
        .merge(chat::router())
        .merge(voice::router())
        .merge(fetch::router())
        .merge(task::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::require_running,
        ));

    let api_routes = Router::new()
        .merge(agent_routes)
        .merge(owner::router())
        .method_not_allowed_fallback(not_found);

    Router::new()
        .route("/", get(frontend::serve_index))
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(app_middleware::powered_by_middleware))
        .layer(middleware::from_fn(app_middleware::request_id_middleware))
        .with_state(state)
}
