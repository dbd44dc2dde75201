//! Token endpoints

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    models::token::{AccessToken, TokenObtainRequest, TokenPair, TokenRefreshRequest, TokenVerifyRequest},
    AppState,
};

use super::JsonBody;

/// Exchange email and password for an access/refresh token pair
#[utoipa::path(
    post,
    path = "/users/token",
    tag = "auth",
    request_body = TokenObtainRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<TokenObtainRequest>,
) -> AppResult<Json<TokenPair>> {
    let pair = state
        .services
        .auth
        .obtain_pair(&request.email, &request.password)
        .await?;
    Ok(Json(pair))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/users/token/refresh",
    tag = "auth",
    request_body = TokenRefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessToken),
        (status = 401, description = "Invalid, expired or non-refresh token")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<TokenRefreshRequest>,
) -> AppResult<Json<AccessToken>> {
    let access = state.services.auth.refresh(&request.refresh)?;
    Ok(Json(access))
}

/// Check that a token is well-formed, correctly signed and unexpired
#[utoipa::path(
    post,
    path = "/users/token/verify",
    tag = "auth",
    request_body = TokenVerifyRequest,
    responses(
        (status = 200, description = "Token is valid"),
        (status = 401, description = "Token is invalid or expired")
    )
)]
pub async fn verify_token(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<TokenVerifyRequest>,
) -> AppResult<Json<Value>> {
    state.services.auth.verify(&request.token)?;
    Ok(Json(json!({})))
}
