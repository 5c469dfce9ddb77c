use crate::agent::AgentError;
use crate::pipeline::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred.";

/// Failures below the HTTP boundary.
pub enum ApiError {
    Pipeline(PipelineError),
    Agent(AgentError),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        ApiError::Agent(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, message) = match self {
            ApiError::Pipeline(PipelineError::EmptyResult { sql }) => {
                error!("Generated query returned no rows: {}", sql);
                (
                    StatusCode::NOT_FOUND,
                    format!("The generated query returned no rows: {}", sql),
                )
            }
            ApiError::Pipeline(err) => {
                error!("SQL prompt failed: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE.to_string())
            }
            ApiError::Agent(err) => {
                error!("SQL agent failed: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE.to_string())
            }
        };

        (status_code, message).into_response()
    }
}
