//! Decoder for OpenAI-style `data: {...}` server-sent events.
//!
//! Network chunks do not respect line boundaries, so bytes are buffered until
//! a full line is available before it is parsed.

use serde_json::Value;

use super::LlmError;

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the text deltas completed by this chunk. An
    /// upstream `{"error": ..}` frame comes back as [`LlmError::Stream`].
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, LlmError>> {
        self.buffer.extend_from_slice(chunk);
        let mut deltas = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(delta) = self.parse_line(&line) {
                deltas.push(delta);
            }
        }
        deltas
    }

    /// Flush a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Option<Result<String, LlmError>> {
        let line = std::mem::take(&mut self.buffer);
        self.parse_line(&line)
    }

    /// True once `data: [DONE]` has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn parse_line(&mut self, raw: &[u8]) -> Option<Result<String, LlmError>> {
        let line = String::from_utf8_lossy(raw);
        let data = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?.trim_start();
        if data == "[DONE]" {
            self.done = true;
            return None;
        }
        let json: Value = serde_json::from_str(data).ok()?;
        if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
            let message = error["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Some(Err(LlmError::Stream(message)));
        }
        let choice = &json["choices"][0];
        choice["delta"]["content"]
            .as_str()
            .or_else(|| choice["message"]["content"].as_str())
            .filter(|s| !s.is_empty())
            .map(|s| Ok(s.to_string()))
    }
}
