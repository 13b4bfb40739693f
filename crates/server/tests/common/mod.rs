#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use bytes::Bytes;
use serde_json::Value;
use server::{routes, state::AppState};
use services::services::{
    config::GatewayConfig,
    fetch::WebFetcher,
    llm::{AudioUpload, ChatCompletion, ChatRequest, LlmError, LlmProvider, SpeechRequest, TextStream},
    owner::{CommandFailure, CommandOutput, CommandRunner, Terminator},
    storage::MemoryFileStorage,
};
use tower::ServiceExt;

pub const PASSWORD: &str = "252912";
pub const APP_ROOT: &str = "/app";

/// One scripted step of a fake chat stream.
#[derive(Debug, Clone)]
pub enum StreamStep {
    Text(&'static str),
    Fail,
}

/// Records every call the gateway makes to the provider.
#[derive(Default)]
pub struct FakeLlm {
    pub configured: bool,
    pub fail_upstream: bool,
    pub stream_script: Vec<StreamStep>,
    pub calls: Mutex<Vec<String>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub speech_requests: Mutex<Vec<SpeechRequest>>,
    pub uploads: Mutex<Vec<AudioUpload>>,
}

impl FakeLlm {
    pub fn configured() -> Self {
        Self {
            configured: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: &str) -> Result<(), LlmError> {
        self.calls.lock().unwrap().push(call.to_string());
        if self.fail_upstream {
            Err(LlmError::Api {
                status: 429,
                body: serde_json::json!({ "error": { "message": "rate limited" } }),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, LlmError> {
        self.record("chat")?;
        self.chat_requests.lock().unwrap().push(request);
        Ok(ChatCompletion {
            text: "pong".into(),
            raw: serde_json::json!({ "choices": [{ "message": { "content": "pong" } }] }),
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<TextStream, LlmError> {
        self.record("chat_stream")?;
        self.chat_requests.lock().unwrap().push(request);
        let items: Vec<Result<String, LlmError>> = self
            .stream_script
            .iter()
            .map(|step| match step {
                StreamStep::Text(text) => Ok(text.to_string()),
                StreamStep::Fail => Err(LlmError::Stream("connection reset".into())),
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn transcribe(&self, _model: &str, audio: AudioUpload) -> Result<String, LlmError> {
        self.record("transcribe")?;
        self.uploads.lock().unwrap().push(audio);
        Ok("hello world".into())
    }

    async fn speak(&self, request: SpeechRequest) -> Result<Bytes, LlmError> {
        self.record("speak")?;
        self.speech_requests.lock().unwrap().push(request);
        Ok(Bytes::from_static(b"RIFF....WAVE"))
    }
}

#[derive(Default)]
pub struct FakeRunner {
    pub calls: Mutex<Vec<(String, Option<PathBuf>)>>,
    pub failure: Option<CommandFailure>,
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        command: &str,
        cwd: Option<&Path>,
        _timeout: Duration,
    ) -> Result<CommandOutput, CommandFailure> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), cwd.map(Path::to_path_buf)));
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(CommandOutput {
                stdout: format!("ran: {command}\n"),
                stderr: String::new(),
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeTerminator {
    pub scheduled: Mutex<Vec<Duration>>,
}

impl Terminator for FakeTerminator {
    fn schedule_exit(&self, delay: Duration) {
        self.scheduled.lock().unwrap().push(delay);
    }
}

pub struct TestApp {
    pub router: Router,
    pub llm: Arc<FakeLlm>,
    pub storage: Arc<MemoryFileStorage>,
    pub runner: Arc<FakeRunner>,
    pub terminator: Arc<FakeTerminator>,
}

pub struct TestAppBuilder {
    config: GatewayConfig,
    llm: FakeLlm,
    storage: MemoryFileStorage,
    runner: FakeRunner,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::with_root(APP_ROOT),
            llm: FakeLlm::default(),
            storage: MemoryFileStorage::new()
                .with_file("/app/index.html", "<html><title>talk</title></html>")
                .with_file("/app/main.rs", "fn main() {}")
                .with_file("/app/Cargo.toml", "[package]"),
            runner: FakeRunner::default(),
        }
    }

    pub fn config(mut self, configure: impl FnOnce(&mut GatewayConfig)) -> Self {
        configure(&mut self.config);
        self
    }

    pub fn llm(mut self, llm: FakeLlm) -> Self {
        self.llm = llm;
        self
    }

    pub fn storage(mut self, storage: MemoryFileStorage) -> Self {
        self.storage = storage;
        self
    }

    pub fn runner(mut self, runner: FakeRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn build(self) -> TestApp {
        let llm = Arc::new(self.llm);
        let storage = Arc::new(self.storage);
        let runner = Arc::new(self.runner);
        let terminator = Arc::new(FakeTerminator::default());
        let fetcher = WebFetcher::from_config(&self.config).unwrap();
        let state = AppState::new(
            self.config,
            llm.clone(),
            fetcher,
            storage.clone(),
            runner.clone(),
            terminator.clone(),
        );
        TestApp {
            router: routes::router(state),
            llm,
            storage,
            runner,
            terminator,
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    /// Wrap a router assembled by hand; the fakes are fresh and unused.
    pub fn from_router(router: Router) -> Self {
        Self {
            router,
            llm: Arc::new(FakeLlm::default()),
            storage: Arc::new(MemoryFileStorage::new()),
            runner: Arc::new(FakeRunner::default()),
            terminator: Arc::new(FakeTerminator::default()),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_raw(&self, uri: &str, body: impl Into<Body>) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(body.into())
            .unwrap();
        self.send(request).await
    }
}

/// Build a `multipart/form-data` body with a single file part.
pub fn multipart_body(field: &str, file_name: &str, mime: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "gatewaytestboundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
