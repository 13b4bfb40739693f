use std::convert::Infallible;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::post,
};
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use services::services::llm::{self, ChatInput, ChatMessage, LlmError};

use crate::{error::ApiError, extract::JsonBody, state::AppState};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

#[derive(Debug, Default, Deserialize)]
pub struct ChatBody {
    pub messages: Option<Vec<ChatMessage>>,
    pub system: Option<String>,
    pub model: Option<String>,
}

impl From<ChatBody> for ChatInput {
    fn from(body: ChatBody) -> Self {
        ChatInput {
            messages: body.messages.unwrap_or_default(),
            system: body.system,
            model: body.model,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub text: String,
    pub raw: Value,
}

pub async fn chat(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ChatBody>,
) -> Result<ResponseJson<ChatResponse>, ApiError> {
    let completion = llm::chat(state.llm.as_ref(), &state.config, body.into())
        .await
        .map_err(ApiError::Chat)?;
    Ok(ResponseJson(ChatResponse {
        text: completion.text,
        raw: completion.raw,
    }))
}

/// Relay text fragments as a chunked `text/plain` body. Failures after the
/// headers are out end the body with a bare newline; the error is only logged.
pub async fn chat_stream(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ChatBody>,
) -> Response {
    let mut fragments = match llm::chat_stream(state.llm.as_ref(), &state.config, body.into()).await
    {
        Ok(fragments) => fragments,
        Err(LlmError::NotConfigured) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, TEXT_PLAIN)],
                "error: Missing GROQ_API_KEY",
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("chat_stream_failed: {}", e);
            return ([(header::CONTENT_TYPE, TEXT_PLAIN)], "\n").into_response();
        }
    };

    let body = async_stream::stream! {
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) if text.is_empty() => continue,
                Ok(text) => yield Ok::<_, Infallible>(Bytes::from(text)),
                Err(e) => {
                    tracing::error!("chat_stream_failed: {}", e);
                    yield Ok(Bytes::from_static(b"\n"));
                    break;
                }
            }
        }
    };

    ([(header::CONTENT_TYPE, TEXT_PLAIN)], Body::from_stream(body)).into_response()
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat-stream", post(chat_stream))
}
