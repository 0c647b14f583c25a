//! Protected routes: users and the generic entity CRUD built from the resolved model.
//! Handlers resolve the entity from the path segment, so one set of routes serves every entity.

use crate::extractors::require_auth;
use crate::handlers::entity::{children, create, delete, list, read, replace, update};
use crate::handlers::users::{get_user, list_users};
use crate::state::AppState;
use axum::{middleware, routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/:path_segment", get(list).post(create))
        .route(
            "/:path_segment/:id",
            get(read).patch(update).put(replace).delete(delete),
        )
        .route("/:path_segment/:id/:child", get(children))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}
