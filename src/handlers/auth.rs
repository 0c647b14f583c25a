//! Signup, login and logout.

use crate::auth::{AuthResponse, LoginRequest, SignupRequest};
use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::response::{self, MessageBody};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "A field is missing"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Authentication"
)]
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let res = state.auth.signup(req).await?;
    Ok(response::created(res))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed token", body = AuthResponse),
        (status = 400, description = "A field is missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let res = state.auth.login(req).await?;
    Ok(response::ok(res))
}

/// Tokens are stateless; the client discards its copy.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Acknowledged", body = MessageBody)),
    tag = "Authentication"
)]
pub async fn logout() -> (StatusCode, Json<MessageBody>) {
    response::message("Logout successful")
}
