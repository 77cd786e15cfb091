use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::Value;

use super::{AppState, caller::Caller, error::AppError};
use crate::card::Deck;
use crate::generate::GenerationRequest;

#[derive(Deserialize)]
pub struct GeneratePayload {
    text: Option<String>,
    count: Option<Value>,
}

pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    payload: Result<Json<GeneratePayload>, JsonRejection>,
) -> Result<Json<Deck>, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedPayload)?;

    let request = GenerationRequest::from_json(payload.text.as_deref(), payload.count.as_ref())?;
    let deck = state.generator.generate(&request, user.id).await?;

    Ok(Json(deck))
}

pub async fn health_handler() -> &'static str {
    "ok"
}
