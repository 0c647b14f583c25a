//! Registered accounts, public fields only.

use crate::error::AppError;
use crate::response;
use crate::state::AppState;
use crate::store::PublicUser;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "All users", body = [PublicUser])),
    security(("jwt" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<PublicUser>>), AppError> {
    let users = state.store.list_users().await?;
    Ok(response::ok(users.iter().map(PublicUser::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "One user", body = PublicUser),
        (status = 404, description = "No such user")
    ),
    security(("jwt" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let id: i64 = id_str
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid id: {}", id_str)))?;
    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(response::ok(PublicUser::from(&user)))
}
