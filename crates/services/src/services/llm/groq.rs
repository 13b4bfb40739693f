//! Groq's OpenAI-compatible REST API.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Response, header::CONTENT_TYPE};
use serde_json::{Value, json};

use super::{
    AudioUpload, ChatCompletion, ChatRequest, LlmError, LlmProvider, SpeechRequest, TextStream,
    sse::SseDecoder,
};
use crate::services::config::GatewayConfig;

#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GroqClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let api_key = api_key.filter(|k| !k.trim().is_empty());

        if api_key.is_some() {
            tracing::info!("GroqClient initialized against {}", base_url);
        } else {
            tracing::warn!("GroqClient created without API key - GROQ_API_KEY not set");
        }

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, LlmError> {
        Self::new(config.llm_base_url.clone(), Some(config.api_key.clone()))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn bearer(&self) -> Result<String, LlmError> {
        self.api_key
            .as_ref()
            .map(|k| format!("Bearer {}", k))
            .ok_or(LlmError::NotConfigured)
    }

    async fn send_chat(&self, request: &ChatRequest, stream: bool) -> Result<Response, LlmError> {
        let payload = json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "stream": stream,
        });

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .header("Authorization", self.bearer()?)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("LLM request failed: {}", e);
                LlmError::Request(e.to_string())
            })?;

        ensure_success(response).await
    }
}

/// Turn a non-2xx response into [`LlmError::Api`], keeping a JSON body when
/// the provider sent one.
async fn ensure_success(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
    tracing::warn!("LLM API error ({}): {}", status, body);
    Err(LlmError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Transcriptions come back either as a bare string or as `{ "text": .. }`
/// depending on the requested format and the provider.
pub fn transcript_from_body(content_type: Option<&str>, body: &str) -> String {
    let is_json = content_type.is_some_and(|ct| ct.contains("json"));
    if is_json || body.trim_start().starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            return match value {
                Value::String(text) => text,
                other => other["text"].as_str().unwrap_or_default().to_string(),
            };
        }
    }
    body.to_string()
}

#[async_trait]
impl LlmProvider for GroqClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, LlmError> {
        let response = self.send_chat(&request, false).await?;
        let raw: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let text = raw["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        tracing::debug!("LLM response received: {} chars", text.len());

        Ok(ChatCompletion { text, raw })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<TextStream, LlmError> {
        let response = self.send_chat(&request, true).await?;
        let mut bytes = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for item in decoder.push(&chunk) {
                            let failed = item.is_err();
                            yield item;
                            if failed {
                                return;
                            }
                        }
                        if decoder.is_done() {
                            return;
                        }
                    }
                    Err(e) => {
                        yield Err(LlmError::Stream(e.to_string()));
                        return;
                    }
                }
            }
            if let Some(item) = decoder.finish() {
                yield item;
            }
        };

        Ok(Box::pin(stream))
    }

    async fn transcribe(&self, model: &str, audio: AudioUpload) -> Result<String, LlmError> {
        let part = reqwest::multipart::Part::bytes(audio.bytes.to_vec())
            .file_name(audio.file_name)
            .mime_str(&audio.mime)
            .map_err(|e| LlmError::Request(format!("Invalid audio MIME type: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", model.to_string())
            .text("response_format", "text");

        let response = self
            .client
            .post(self.endpoint("audio/transcriptions"))
            .header("Authorization", self.bearer()?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;
        let response = ensure_success(response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(transcript_from_body(content_type.as_deref(), &body))
    }

    async fn speak(&self, request: SpeechRequest) -> Result<Bytes, LlmError> {
        let payload = json!({
            "model": request.model,
            "input": request.input,
            "voice": request.voice,
            "response_format": request.format,
        });

        let response = self
            .client
            .post(self.endpoint("audio/speech"))
            .header("Authorization", self.bearer()?)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;
        let response = ensure_success(response).await?;

        response
            .bytes()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))
    }
}
