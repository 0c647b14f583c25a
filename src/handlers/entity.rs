//! Entity CRUD handlers, generic over the path segment.

use crate::auth::AuthUser;
use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::response::{self, MessageBody};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid id: {}", id_str)))
}

/// Resolve the entity and check the operation is enabled for it.
fn entity<'a>(state: &'a AppState, path: &str, op: &str) -> Result<&'a ResolvedEntity, AppError> {
    let entity = state
        .model
        .entity_by_path(path)
        .ok_or_else(|| AppError::NotFound(format!("Unknown resource: {}", path)))?;
    if !entity.allows(op) {
        return Err(AppError::NotAllowed(format!("{} is not allowed on {}", op, path)));
    }
    Ok(entity)
}

#[utoipa::path(
    get,
    path = "/api/{entity}",
    params(("entity" = String, Path, description = "courses, students, instructors or enrollments")),
    responses(
        (status = 200, description = "All rows ordered by id, relations embedded"),
        (status = 401, description = "Missing token"),
        (status = 404, description = "Unknown resource")
    ),
    security(("jwt" = [])),
    tag = "Resources"
)]
pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
) -> Result<(StatusCode, Json<Vec<crate::store::Row>>), AppError> {
    let entity = entity(&state, &path_segment, "list")?;
    let rows = CrudService::list(state.store.as_ref(), &state.model, entity).await?;
    Ok(response::ok(rows))
}

#[utoipa::path(
    post,
    path = "/api/{entity}",
    params(("entity" = String, Path, description = "Resource name")),
    request_body = serde_json::Value,
    responses(
        (status = 201, description = "Created row with generated id"),
        (status = 400, description = "Validation or reference error"),
        (status = 409, description = "Unique constraint violated")
    ),
    security(("jwt" = [])),
    tag = "Resources"
)]
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(path_segment): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<crate::store::Row>), AppError> {
    let entity = entity(&state, &path_segment, "create")?;
    let row = CrudService::create(state.store.as_ref(), entity, &body).await?;
    tracing::info!(entity = %path_segment, id = ?row.get("id"), user_id = user.id, "created");
    Ok(response::created(row))
}

#[utoipa::path(
    get,
    path = "/api/{entity}/{id}",
    params(
        ("entity" = String, Path, description = "Resource name"),
        ("id" = i64, Path, description = "Row id")
    ),
    responses(
        (status = 200, description = "One row, relations embedded"),
        (status = 404, description = "No row with this id")
    ),
    security(("jwt" = [])),
    tag = "Resources"
)]
pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<(StatusCode, Json<crate::store::Row>), AppError> {
    let entity = entity(&state, &path_segment, "read")?;
    let id = parse_id(&id_str)?;
    let row = CrudService::read(state.store.as_ref(), &state.model, entity, id).await?;
    Ok(response::ok(row))
}

#[utoipa::path(
    patch,
    path = "/api/{entity}/{id}",
    params(
        ("entity" = String, Path, description = "Resource name"),
        ("id" = i64, Path, description = "Row id")
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Updated row; only supplied fields changed"),
        (status = 400, description = "Validation or reference error"),
        (status = 404, description = "No row with this id")
    ),
    security(("jwt" = [])),
    tag = "Resources"
)]
pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<crate::store::Row>), AppError> {
    let entity = entity(&state, &path_segment, "update")?;
    let id = parse_id(&id_str)?;
    let row = CrudService::update(state.store.as_ref(), entity, id, &body).await?;
    Ok(response::ok(row))
}

#[utoipa::path(
    put,
    path = "/api/{entity}/{id}",
    params(
        ("entity" = String, Path, description = "Resource name"),
        ("id" = i64, Path, description = "Row id")
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Replaced row; omitted columns reset to default or null"),
        (status = 400, description = "Validation or reference error"),
        (status = 404, description = "No row with this id")
    ),
    security(("jwt" = [])),
    tag = "Resources"
)]
pub async fn replace(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<crate::store::Row>), AppError> {
    let entity = entity(&state, &path_segment, "update")?;
    let id = parse_id(&id_str)?;
    let row = CrudService::replace(state.store.as_ref(), entity, id, &body).await?;
    Ok(response::ok(row))
}

#[utoipa::path(
    delete,
    path = "/api/{entity}/{id}",
    params(
        ("entity" = String, Path, description = "Resource name"),
        ("id" = i64, Path, description = "Row id")
    ),
    responses(
        (status = 200, description = "Row removed", body = MessageBody),
        (status = 404, description = "No row with this id"),
        (status = 409, description = "Row is still referenced")
    ),
    security(("jwt" = [])),
    tag = "Resources"
)]
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<(StatusCode, Json<MessageBody>), AppError> {
    let entity = entity(&state, &path_segment, "delete")?;
    let id = parse_id(&id_str)?;
    CrudService::delete(state.store.as_ref(), entity, id).await?;
    tracing::info!(entity = %path_segment, id, user_id = user.id, "deleted");
    Ok(response::message(format!("{} deleted successfully", entity.label)))
}

#[utoipa::path(
    get,
    path = "/api/{entity}/{id}/{child}",
    params(
        ("entity" = String, Path, description = "Parent resource"),
        ("id" = i64, Path, description = "Parent id"),
        ("child" = String, Path, description = "Referencing resource, e.g. enrollments")
    ),
    responses(
        (status = 200, description = "Child rows referencing the parent"),
        (status = 404, description = "Unknown parent or relation")
    ),
    security(("jwt" = [])),
    tag = "Resources"
)]
pub async fn children(
    State(state): State<AppState>,
    Path((path_segment, id_str, child)): Path<(String, String, String)>,
) -> Result<(StatusCode, Json<Vec<crate::store::Row>>), AppError> {
    let parent = entity(&state, &path_segment, "read")?;
    entity(&state, &child, "list")?;
    let id = parse_id(&id_str)?;
    let rows =
        CrudService::list_children(state.store.as_ref(), &state.model, parent, id, &child).await?;
    Ok(response::ok(rows))
}
