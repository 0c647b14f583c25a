//! Bearer token extraction and the authentication gate for protected routes.

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

/// Token from `Authorization: Bearer <token>`, if any.
#[derive(Clone, Debug)]
pub struct BearerToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| {
                let (scheme, token) = s.trim().split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim().to_string())
            })
            .filter(|s| !s.is_empty());
        Ok(BearerToken(value))
    }
}

/// Identity placed in request extensions by [`require_auth`].
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Auth("Access token required".into()))
    }
}

/// Rejects the request with 401/403 unless it carries a valid token.
pub async fn require_auth(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = state.auth.verify(token.as_deref())?;
    tracing::debug!(user_id = user.id, "authenticated");
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
