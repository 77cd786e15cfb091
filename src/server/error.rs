use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::generate::GenerationError;

const GENERATION_FAILED: &str = "Generation failed. Try again later.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Access denied")]
    Unauthorized,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::MalformedPayload => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Generation(GenerationError::Input(message)) => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            AppError::Generation(err) => {
                error!("generation failed: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, GENERATION_FAILED.to_string())
            }
            AppError::Internal(err) => {
                error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
