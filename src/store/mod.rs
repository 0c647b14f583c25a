//! Storage seam. Handlers and services talk to `dyn Store`; PostgreSQL backs production and
//! an in-memory store backs tests and database-less runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::config::ResolvedEntity;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// One entity row as a JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// A registered account. `password_hash` never leaves the auth layer.
#[derive(Clone, Debug)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Public projection of a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<&UserRecord> for PublicUser {
    fn from(u: &UserRecord) -> Self {
        PublicUser {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness probe for readiness checks.
    async fn ping(&self) -> Result<(), AppError>;

    /// All rows ordered by id, optionally where `column = value`.
    async fn list(
        &self,
        entity: &ResolvedEntity,
        filter: Option<(&str, &Value)>,
    ) -> Result<Vec<Row>, AppError>;

    async fn read(&self, entity: &ResolvedEntity, id: i64) -> Result<Option<Row>, AppError>;

    /// Rows whose id is in `ids`, ordered by id. Missing ids are skipped.
    async fn read_many(&self, entity: &ResolvedEntity, ids: &[i64]) -> Result<Vec<Row>, AppError>;

    /// Insert a row. Reference and uniqueness checks happen atomically with the write:
    /// `AppError::Reference` for a dangling FK, `AppError::Conflict` for a duplicate.
    async fn create(&self, entity: &ResolvedEntity, fields: &Row) -> Result<Row, AppError>;

    /// Write the supplied columns. `Ok(None)` when the id does not exist.
    async fn update(
        &self,
        entity: &ResolvedEntity,
        id: i64,
        fields: &Row,
    ) -> Result<Option<Row>, AppError>;

    /// Remove a row. `Ok(false)` when the id does not exist; `AppError::Conflict` while
    /// other rows still reference it.
    async fn delete(&self, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError>;

    /// `AppError::Conflict` when the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;

    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, AppError>;

    async fn list_users(&self) -> Result<Vec<UserRecord>, AppError>;
}

pub(crate) fn restrict_message(entity: &ResolvedEntity, id: i64, referrer: &str) -> String {
    format!(
        "{} {} is still referenced by {}",
        entity.label, id, referrer
    )
}

pub(crate) fn reference_message(column: &str, value: &Value, target_label: &str) -> String {
    format!(
        "{} {} does not reference an existing {}",
        column,
        value,
        target_label.to_lowercase()
    )
}

pub(crate) const EMAIL_TAKEN: &str = "User already exists";
