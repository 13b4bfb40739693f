use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use services::services::{fetch::FetchError, llm::LlmError, owner::OwnerError};
use thiserror::Error;
use utils::response::ErrorBody;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("chat: {0}")]
    Chat(#[source] LlmError),
    #[error("stt: {0}")]
    Transcribe(#[source] LlmError),
    #[error("tts: {0}")]
    Speech(#[source] LlmError),
    #[error("task: {0}")]
    Task(#[source] LlmError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Owner(#[from] OwnerError),
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),
    #[error("No route")]
    NotFound,
    #[error("Agent is shut down")]
    ShutDown,
}

impl ApiError {
    /// HTTP status and the machine-readable `error` string.
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Chat(e) => llm_status(e, "chat_failed"),
            ApiError::Transcribe(e) => llm_status(e, "stt_failed"),
            ApiError::Speech(e) => llm_status(e, "tts_failed"),
            ApiError::Task(e) => llm_status(e, "task_failed"),
            ApiError::Fetch(e) => match e {
                FetchError::MissingUrl => (StatusCode::BAD_REQUEST, "Invalid URL"),
                FetchError::Blocked(_) => (StatusCode::FORBIDDEN, "domain_blocked"),
                FetchError::NeedsApproval { .. } => (StatusCode::UNAUTHORIZED, "needs_approval"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "fetch_failed"),
            },
            ApiError::Owner(e) => match e {
                OwnerError::ShellDisabled => (StatusCode::FORBIDDEN, "shell_disabled"),
                OwnerError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
                OwnerError::NoCommand => (StatusCode::BAD_REQUEST, "no_command"),
                OwnerError::BlockedCommand(_) => (StatusCode::BAD_REQUEST, "blocked_command"),
                OwnerError::Exec(_) => (StatusCode::INTERNAL_SERVER_ERROR, "exec_failed"),
                OwnerError::FileNotAllowed(_) => (StatusCode::BAD_REQUEST, "file_not_allowed"),
                OwnerError::MissingContent | OwnerError::Write(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "self_edit_failed")
                }
                OwnerError::Restart(_) => (StatusCode::INTERNAL_SERVER_ERROR, "restart_failed"),
                OwnerError::NoDomain => (StatusCode::BAD_REQUEST, "no_domain"),
            },
            ApiError::Multipart(e) => (e.status(), "stt_failed"),
            ApiError::InvalidJson(_) => (StatusCode::BAD_REQUEST, "invalid_json"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::ShutDown => (StatusCode::SERVICE_UNAVAILABLE, "agent_shut_down"),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ApiError::Chat(e)
            | ApiError::Transcribe(e)
            | ApiError::Speech(e)
            | ApiError::Task(e) => match e {
                LlmError::NotConfigured => None,
                other if other.is_validation() => None,
                other => Some(other.details()),
            },
            ApiError::Fetch(FetchError::MissingUrl) => None,
            ApiError::Fetch(e) => Some(e.details()),
            ApiError::Owner(e) => e.details(),
            ApiError::Multipart(e) => Some(Value::String(e.body_text())),
            ApiError::InvalidJson(msg) => Some(Value::String(msg.clone())),
            ApiError::NotFound | ApiError::ShutDown => None,
        }
    }
}

/// Credential and input problems keep their own message; anything the
/// upstream call raised collapses to the route's failure kind.
fn llm_status(error: &LlmError, failure: &'static str) -> (StatusCode, &'static str) {
    match error {
        LlmError::NotConfigured => (StatusCode::INTERNAL_SERVER_ERROR, "Missing GROQ_API_KEY"),
        LlmError::MissingAudio => (StatusCode::BAD_REQUEST, "No audio uploaded"),
        LlmError::MissingText => (StatusCode::BAD_REQUEST, "No text provided"),
        LlmError::MissingGoal => (StatusCode::BAD_REQUEST, "No goal provided"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, failure),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, kind) = self.classify();

        if status_code.is_server_error() {
            tracing::error!("{}: {}", kind, self);
        } else {
            tracing::debug!("{} ({}): {}", kind, status_code, self);
        }

        // The approval prompt carries what the client needs to ask the user.
        if let ApiError::Fetch(FetchError::NeedsApproval { domain, url }) = &self {
            let body = json!({
                "error": kind,
                "needsApproval": true,
                "domain": domain,
                "url": url,
            });
            return (status_code, Json(body)).into_response();
        }

        let body = match self.details() {
            Some(details) => ErrorBody::new(kind).with_details(details),
            None => ErrorBody::new(kind),
        };
        (status_code, Json(body)).into_response()
    }
}
