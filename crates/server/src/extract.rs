//! JSON body extraction that tolerates a missing body.
//!
//! Clients post to these routes with or without a `Content-Type`, and some
//! send nothing at all. An empty body reads as `T::default()` (every field
//! absent); anything else must be valid JSON for `T`.

use axum::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

use crate::error::ApiError;

pub struct JsonBody<T>(pub T);

pub fn parse_body<T>(bytes: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::InvalidJson(e.to_string()))
}

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // Size limits surface here as a 413 from the `Bytes` rejection.
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        parse_body(&bytes)
            .map(JsonBody)
            .map_err(IntoResponse::into_response)
    }
}

/// Body for the owner routes. Any JSON document is accepted; one that is
/// not an object reads as `T::default()`. Pair with [`lenient_string`] fields
/// so a mistyped value never stops the password check from running.
pub struct LenientBody<T>(pub T);

impl<S, T> FromRequest<S> for LenientBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<Value>::from_request(req, state).await?;
        Ok(LenientBody(serde_json::from_value(value).unwrap_or_default()))
    }
}

/// Keep a field only when it is a JSON string; any other value reads as
/// absent. Use with `#[serde(default, deserialize_with = "lenient_string")]`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}
