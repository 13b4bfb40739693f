//! Owner-only routes. Every handler goes through the console's password
//! check before touching the shell, the disk, the process or the agent
//! switch. Bodies are read leniently: a field of the wrong JSON type counts
//! as missing, so a numeric password is simply wrong rather than malformed.

use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use serde::{Deserialize, Serialize};
use services::services::owner::{CommandOutput, ExecRequest, OwnerStatus, SelfEditRequest};

use crate::{
    error::ApiError,
    extract::{LenientBody, lenient_string},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct PasswordBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub command: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cwd: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SelfEditBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AllowBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub domain: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ExecResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub output: CommandOutput,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub ok: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SwitchResponse {
    pub ok: bool,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AllowResponse {
    pub ok: bool,
    pub allowed: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub status: OwnerStatus,
}

pub async fn exec(
    State(state): State<AppState>,
    LenientBody(body): LenientBody<ExecBody>,
) -> Result<ResponseJson<ExecResponse>, ApiError> {
    let output = state
        .owner
        .exec(ExecRequest {
            password: body.password,
            command: body.command,
            cwd: body.cwd,
        })
        .await?;
    Ok(ResponseJson(ExecResponse { ok: true, output }))
}

pub async fn self_edit(
    State(state): State<AppState>,
    LenientBody(body): LenientBody<SelfEditBody>,
) -> Result<ResponseJson<OkResponse>, ApiError> {
    state
        .owner
        .self_edit(SelfEditRequest {
            password: body.password,
            filename: body.filename,
            content: body.content,
        })
        .await?;
    Ok(ResponseJson(OkResponse { ok: true }))
}

pub async fn stop(
    State(state): State<AppState>,
    LenientBody(body): LenientBody<PasswordBody>,
) -> Result<ResponseJson<StopResponse>, ApiError> {
    state.owner.stop(body.password.as_deref())?;
    Ok(ResponseJson(StopResponse {
        ok: true,
        message: "Stopping server",
    }))
}

pub async fn shutdown(
    State(state): State<AppState>,
    LenientBody(body): LenientBody<PasswordBody>,
) -> Result<ResponseJson<SwitchResponse>, ApiError> {
    state.owner.shutdown(body.password.as_deref())?;
    Ok(ResponseJson(SwitchResponse {
        ok: true,
        status: "shutdown",
    }))
}

pub async fn start(
    State(state): State<AppState>,
    LenientBody(body): LenientBody<PasswordBody>,
) -> Result<ResponseJson<SwitchResponse>, ApiError> {
    state.owner.start(body.password.as_deref())?;
    Ok(ResponseJson(SwitchResponse {
        ok: true,
        status: "running",
    }))
}

pub async fn allow_domain(
    State(state): State<AppState>,
    LenientBody(body): LenientBody<AllowBody>,
) -> Result<ResponseJson<AllowResponse>, ApiError> {
    let allowed = state
        .owner
        .allow_domain(body.password.as_deref(), body.domain.as_deref())?;
    Ok(ResponseJson(AllowResponse { ok: true, allowed }))
}

pub async fn status(
    State(state): State<AppState>,
    LenientBody(body): LenientBody<PasswordBody>,
) -> Result<ResponseJson<StatusResponse>, ApiError> {
    let status = state
        .owner
        .status(body.password.as_deref(), state.llm.is_configured())?;
    Ok(ResponseJson(StatusResponse { ok: true, status }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/exec", post(exec))
        .route("/self-edit", post(self_edit))
        .route("/stop", post(stop))
        .route("/shutdown", post(shutdown))
        .route("/start", post(start))
        .route("/allow", post(allow_domain))
        .route("/status", post(status))
}
