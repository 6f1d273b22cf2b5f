//! Registration, login and logout endpoints.

use api_types::auth::{Credentials, TokenResponse};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::Principal;

use crate::{ServerError, extract::ApiJson, server::ServerState};

pub async fn register(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<Credentials>,
) -> Result<(StatusCode, Json<TokenResponse>), ServerError> {
    let registration = state
        .engine
        .register(
            payload.username.as_deref().unwrap_or_default(),
            payload.password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            message: "User registered Successfully".to_string(),
            token: registration.token,
        }),
    ))
}

pub async fn login(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<Credentials>,
) -> Result<Json<TokenResponse>, ServerError> {
    let token = state
        .engine
        .login(
            payload.username.as_deref().unwrap_or_default(),
            payload.password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(TokenResponse {
        message: "Login Successful".to_string(),
        token,
    }))
}

pub async fn logout(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
) -> Result<StatusCode, ServerError> {
    state.engine.logout(&principal).await?;
    Ok(StatusCode::NO_CONTENT)
}
