//! Goal-to-plan helper. The model only proposes; the client drives any
//! browsing through `/api/fetch`.

use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use serde::{Deserialize, Serialize};
use services::services::llm;

use crate::{error::ApiError, extract::JsonBody, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct TaskBody {
    pub goal: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub plan: String,
}

pub async fn plan_task(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<TaskBody>,
) -> Result<ResponseJson<TaskResponse>, ApiError> {
    let plan = llm::plan_task(state.llm.as_ref(), &state.config, body.goal.as_deref())
        .await
        .map_err(ApiError::Task)?;
    Ok(ResponseJson(TaskResponse { plan }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/task", post(plan_task))
}
