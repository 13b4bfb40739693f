//! Hosted LLM access: chat (blocking and streaming), transcription and speech.
//!
//! Handlers call the free functions in this module rather than the provider
//! directly, so the credential check and input validation always run before
//! anything leaves the process.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::config::GatewayConfig;

pub mod groq;
pub mod prompts;
pub mod sse;

pub use groq::GroqClient;

pub const CHAT_TEMPERATURE: f32 = 0.5;
pub const SUMMARY_TEMPERATURE: f32 = 0.2;
pub const PLAN_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_AUDIO_MIME: &str = "audio/webm";
pub const DEFAULT_SPEECH_FORMAT: &str = "wav";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing GROQ_API_KEY")]
    NotConfigured,
    #[error("No audio uploaded")]
    MissingAudio,
    #[error("No text provided")]
    MissingText,
    #[error("No goal provided")]
    MissingGoal,
    #[error("Request failed: {0}")]
    Request(String),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: Value },
    #[error("Response parse error: {0}")]
    Parse(String),
    #[error("Stream interrupted: {0}")]
    Stream(String),
}

impl LlmError {
    /// Payload for the `details` field of an error response. Upstream API
    /// errors keep their JSON body so callers see the provider's message.
    pub fn details(&self) -> Value {
        match self {
            LlmError::Api { body, .. } => body.clone(),
            other => Value::String(other.to_string()),
        }
    }

    /// Client-side mistakes as opposed to configuration or upstream failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LlmError::MissingAudio | LlmError::MissingText | LlmError::MissingGoal
        )
    }
}

/// One conversation entry. Only `role` and `content` are read here; any
/// other field the caller sent (`name`, `tool_call_id`, `tool_calls`, ..)
/// rides along in `extra` and reaches the provider unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    /// A string, or an array of parts for multimodal input.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub content: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    fn text_message(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content: Value::String(content),
            extra: Map::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text_message("system", content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text_message("user", content.into())
    }

    /// Plain-text content, when the message has any.
    pub fn text(&self) -> Option<&str> {
        self.content.as_str()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub text: String,
    /// Upstream response body, returned untouched to the caller.
    pub raw: Value,
}

/// Incremental text fragments, in the order the provider produced them.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub bytes: Bytes,
    pub file_name: String,
    pub mime: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub model: String,
    pub input: String,
    pub voice: String,
    pub format: String,
}

#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

/// Caller-supplied chat input, as accepted by both chat routes.
#[derive(Debug, Clone, Default)]
pub struct ChatInput {
    pub messages: Vec<ChatMessage>,
    pub system: Option<String>,
    pub model: Option<String>,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Whether a credential is present. Nothing is sent when this is false.
    fn is_configured(&self) -> bool;

    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, LlmError>;

    async fn chat_stream(&self, request: ChatRequest) -> Result<TextStream, LlmError>;

    async fn transcribe(&self, model: &str, audio: AudioUpload) -> Result<String, LlmError>;

    async fn speak(&self, request: SpeechRequest) -> Result<Bytes, LlmError>;
}

fn chat_request(config: &GatewayConfig, input: ChatInput) -> ChatRequest {
    let model = utils::text::non_blank(input.model.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| config.chat_model.clone());
    ChatRequest {
        model,
        messages: prompts::with_system_prompt(input.system.as_deref(), input.messages),
        temperature: CHAT_TEMPERATURE,
    }
}

pub async fn chat(
    provider: &dyn LlmProvider,
    config: &GatewayConfig,
    input: ChatInput,
) -> Result<ChatCompletion, LlmError> {
    if !provider.is_configured() {
        return Err(LlmError::NotConfigured);
    }
    provider.chat(chat_request(config, input)).await
}

pub async fn chat_stream(
    provider: &dyn LlmProvider,
    config: &GatewayConfig,
    input: ChatInput,
) -> Result<TextStream, LlmError> {
    if !provider.is_configured() {
        return Err(LlmError::NotConfigured);
    }
    provider.chat_stream(chat_request(config, input)).await
}

pub async fn transcribe(
    provider: &dyn LlmProvider,
    config: &GatewayConfig,
    audio: Option<AudioUpload>,
) -> Result<String, LlmError> {
    if !provider.is_configured() {
        return Err(LlmError::NotConfigured);
    }
    let audio = audio.ok_or(LlmError::MissingAudio)?;
    provider.transcribe(&config.stt_model, audio).await
}

pub async fn speak(
    provider: &dyn LlmProvider,
    config: &GatewayConfig,
    text: Option<&str>,
    voice: Option<&str>,
    format: Option<&str>,
) -> Result<SynthesizedAudio, LlmError> {
    if !provider.is_configured() {
        return Err(LlmError::NotConfigured);
    }
    let input = utils::text::non_blank(text).ok_or(LlmError::MissingText)?;
    let format = utils::text::non_blank(format)
        .unwrap_or(DEFAULT_SPEECH_FORMAT)
        .trim()
        .to_ascii_lowercase();
    let voice = utils::text::non_blank(voice).unwrap_or(&config.default_voice);

    let content_type = audio_content_type(&format);
    let bytes = provider
        .speak(SpeechRequest {
            model: config.tts_model.clone(),
            input: input.to_string(),
            voice: voice.to_string(),
            format,
        })
        .await?;

    Ok(SynthesizedAudio {
        bytes,
        content_type,
    })
}

/// Ask the provider for the four-part page summary. Returns `None` when no
/// credential is configured.
pub async fn summarize_page(
    provider: &dyn LlmProvider,
    config: &GatewayConfig,
    page: &prompts::PageDigest<'_>,
) -> Result<Option<String>, LlmError> {
    if !provider.is_configured() {
        return Ok(None);
    }
    let completion = provider
        .chat(ChatRequest {
            model: config.chat_model.clone(),
            messages: vec![
                ChatMessage::system(prompts::SUMMARIZER_SYSTEM_PROMPT),
                ChatMessage::user(prompts::summary_prompt(page)),
            ],
            temperature: SUMMARY_TEMPERATURE,
        })
        .await?;
    Ok(Some(completion.text))
}

/// Ask for a short, concrete plan toward `goal`. Any browsing the plan calls
/// for is left to the caller.
pub async fn plan_task(
    provider: &dyn LlmProvider,
    config: &GatewayConfig,
    goal: Option<&str>,
) -> Result<String, LlmError> {
    if !provider.is_configured() {
        return Err(LlmError::NotConfigured);
    }
    let goal = utils::text::non_blank(goal).ok_or(LlmError::MissingGoal)?;
    let completion = provider
        .chat(ChatRequest {
            model: config.chat_model.clone(),
            messages: vec![
                ChatMessage::system(prompts::PLANNER_SYSTEM_PROMPT),
                ChatMessage::user(prompts::plan_prompt(goal.trim())),
            ],
            temperature: PLAN_TEMPERATURE,
        })
        .await?;
    Ok(completion.text)
}

pub fn audio_content_type(format: &str) -> &'static str {
    match format {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "ogg" | "opus" => "audio/ogg",
        "aac" => "audio/aac",
        _ => "application/octet-stream",
    }
}
