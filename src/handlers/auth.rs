use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::auth;
use crate::error::AppError;
use crate::models::{Credentials, TokenResponse, User};
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = auth::register(&state.db, &req.username, &req.password)?;
    info!(user_id = %user.id, username = %user.username, "Registered user");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = auth::login(&state.db, &state.tokens, &req.username, &req.password)
        .inspect_err(|err| {
            if matches!(err, AppError::Unauthorized) {
                info!(username = %req.username, "Rejected login");
            }
        })?;
    info!(username = %req.username, "User logged in");
    Ok(Json(TokenResponse { token }))
}
