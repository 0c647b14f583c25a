//! CourseHub: course, student, instructor and enrollment administration over a REST API with
//! bearer-token authentication. Entities are described by a declarative model and served by
//! one generic CRUD component.

pub mod auth;
pub mod config;
pub mod doc;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod seed;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{builtin_config, load_from_file, resolve, FullConfig, ResolvedEntity, ResolvedModel};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use seed::{seed, SeedSummary};
pub use settings::{Settings, StoreKind};
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store};

use axum::{routing::get, Json, Router};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(doc::ApiDoc::openapi())
}

/// Full application router: common routes at the root, the API under `/api`.
pub fn build_app(state: AppState, max_body_bytes: usize) -> Router {
    let api = Router::new()
        .route("/openapi.json", get(openapi))
        .merge(routes::auth_routes(state.clone()))
        .merge(routes::entity_routes(state.clone()));
    Router::new()
        .merge(routes::common_routes(state))
        .nest("/api", api)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
