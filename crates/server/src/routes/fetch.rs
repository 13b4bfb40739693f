use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use serde::Deserialize;
use services::services::fetch::{FetchReport, FetchRequest};

use crate::{error::ApiError, extract::JsonBody, state::AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchBody {
    pub url: Option<String>,
    pub user_agent: Option<String>,
    #[serde(default)]
    pub summarize: bool,
    #[serde(default)]
    pub approve: bool,
}

pub async fn fetch_page(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<FetchBody>,
) -> Result<ResponseJson<FetchReport>, ApiError> {
    let request = FetchRequest {
        url: body.url,
        user_agent: body.user_agent,
        summarize: body.summarize,
        approve: body.approve,
    };
    let report = state
        .fetcher
        .fetch(request, state.llm.as_ref(), &state.config)
        .await?;
    Ok(ResponseJson(report))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/fetch", post(fetch_page))
}
