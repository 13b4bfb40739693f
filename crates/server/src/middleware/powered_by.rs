use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

pub const POWERED_BY_HEADER: &str = "x-powered-by";
pub const GATEWAY_BUILD: &str = "groq-talk-mode-v3";

/// Stamp every response, fallbacks and errors included, with the gateway build.
pub async fn powered_by_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        HeaderName::from_static(POWERED_BY_HEADER),
        HeaderValue::from_static(GATEWAY_BUILD),
    );
    response
}
