use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::web::errors::ApiError;
use crate::web::state::AppState;

pub const MISSING_PROMPT_MESSAGE: &str =
    "Pass a prompt in the query string or in the request body for the correct result.";

#[derive(Debug, Deserialize)]
pub struct PromptParams {
    pub prompt: Option<String>,
}

/// Query parameter first, then the JSON body's `prompt` field. Empty counts as absent.
pub fn extract_prompt(params: Option<PromptParams>, body: &[u8]) -> Option<String> {
    if let Some(prompt) = params.and_then(|p| p.prompt).filter(|p| !p.is_empty()) {
        return Some(prompt);
    }

    let json: serde_json::Value = serde_json::from_slice(body).ok()?;
    json.get("prompt")
        .and_then(|v| v.as_str())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

fn missing_prompt() -> Response {
    (StatusCode::OK, MISSING_PROMPT_MESSAGE).into_response()
}

// Natural language question answered with a single generated query
pub async fn sql_prompt(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PromptParams>, QueryRejection>,
    body: Bytes,
) -> Result<Response, ApiError> {
    info!("SQL prompt request received");

    let Some(prompt) = extract_prompt(params.ok().map(|Query(p)| p), &body) else {
        return Ok(missing_prompt());
    };

    let record = state.pipeline.answer(&prompt).await?;

    info!("Returning the result");
    Ok(Json(record).into_response())
}

// Natural language question answered by the SQL agent
pub async fn lang_prompt(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PromptParams>, QueryRejection>,
    body: Bytes,
) -> Result<Response, ApiError> {
    info!("Agent prompt request received");

    let Some(prompt) = extract_prompt(params.ok().map(|Query(p)| p), &body) else {
        return Ok(missing_prompt());
    };

    info!("This is your prompt: {}", prompt);
    let response = state.agent.run(&prompt).await?;

    Ok(format!("Hello, This is your response from LangChain : {}", response).into_response())
}
