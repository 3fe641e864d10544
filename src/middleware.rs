use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use tracing::warn;

use crate::auth::TokenError;
use crate::error::AppError;
use crate::AppState;

/// The user a request was authenticated as, resolved from its bearer token.
/// Handlers taking this extractor never run for unauthenticated requests.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| {
                    warn!(reason = %rejection, path = %parts.uri.path(), "Missing bearer token");
                    AppError::Unauthorized
                })?;

        match state.tokens.verify(bearer.token()) {
            Ok(claims) => Ok(AuthUser(claims.sub)),
            Err(TokenError::Expired) => {
                warn!(path = %parts.uri.path(), "Expired bearer token");
                Err(AppError::Unauthorized)
            }
            Err(TokenError::Invalid(reason)) => {
                warn!(%reason, path = %parts.uri.path(), "Invalid bearer token");
                Err(AppError::Unauthorized)
            }
        }
    }
}
