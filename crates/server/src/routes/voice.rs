//! Speech-to-text and text-to-speech pass-through.

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::header,
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use services::services::llm::{self, AudioUpload, DEFAULT_AUDIO_MIME};

use super::UPLOAD_BODY_LIMIT;
use crate::{error::ApiError, extract::JsonBody, state::AppState};

/// Multipart field carrying the recording.
pub const AUDIO_FIELD: &str = "audio";

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpeechBody {
    pub text: Option<String>,
    pub voice: Option<String>,
    pub format: Option<String>,
}

/// First `audio` part of the form, if any. A body that is not multipart at
/// all reads as "no audio".
async fn read_audio(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Option<AudioUpload>, ApiError> {
    let Ok(mut multipart) = multipart else {
        return Ok(None);
    };

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("audio.webm").to_string();
        let mime = field
            .content_type()
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_AUDIO_MIME)
            .to_string();
        let bytes = field.bytes().await?;
        tracing::debug!("Received {} bytes of {} audio", bytes.len(), mime);
        return Ok(Some(AudioUpload {
            bytes,
            file_name,
            mime,
        }));
    }
    Ok(None)
}

pub async fn speech_to_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ResponseJson<TranscriptResponse>, ApiError> {
    if !state.llm.is_configured() {
        return Err(ApiError::Transcribe(llm::LlmError::NotConfigured));
    }
    let audio = read_audio(multipart).await?;
    let text = llm::transcribe(state.llm.as_ref(), &state.config, audio)
        .await
        .map_err(ApiError::Transcribe)?;
    Ok(ResponseJson(TranscriptResponse { text }))
}

pub async fn text_to_speech(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SpeechBody>,
) -> Result<Response, ApiError> {
    let audio = llm::speak(
        state.llm.as_ref(),
        &state.config,
        body.text.as_deref(),
        body.voice.as_deref(),
        body.format.as_deref(),
    )
    .await
    .map_err(ApiError::Speech)?;

    Ok(([(header::CONTENT_TYPE, audio.content_type)], audio.bytes).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/stt",
            post(speech_to_text).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/tts", post(text_to_speech))
}
