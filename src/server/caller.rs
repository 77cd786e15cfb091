use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AppState, error::AppError};
use crate::auth::authenticate;
use crate::crud::User;

/// The authenticated user behind a request.
pub struct Caller(pub User);

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let user = authenticate(&state.db, header)
            .await
            .map_err(AppError::Internal)?
            .ok_or(AppError::Unauthorized)?;

        Ok(Caller(user))
    }
}
