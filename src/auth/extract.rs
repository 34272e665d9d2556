//! Bearer-token extractor for protected routes

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::error::AppError;
use crate::state::AppState;

use super::{verify_token, Claims};

/// The authenticated user, extracted from the `Authorization` header
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Malformed authorization header".to_string()))?;

        let claims = verify_token(token, &state.config().auth.jwt_secret)?;
        Ok(AuthUser(claims))
    }
}
