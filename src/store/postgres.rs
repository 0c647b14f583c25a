//! PostgreSQL store: executes builder queries through a shared pool.

use crate::config::{FieldKind, ResolvedEntity};
use crate::error::AppError;
use crate::sql::{self, bind_all, QueryBuf};
use crate::store::{
    reference_message, restrict_message, NewUser, Row, Store, UserRecord, EMAIL_TAKEN,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgDatabaseError, PgRow};
use sqlx::{ConnectOptions, PgPool, Row as _};
use std::str::FromStr;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const NOT_NULL_VIOLATION: &str = "23502";

type UserTuple = (i64, String, String, String, DateTime<Utc>);

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all(&self, entity: &ResolvedEntity, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| row_to_json(entity, r)).collect())
    }

    async fn fetch_optional(
        &self,
        entity: &ResolvedEntity,
        q: &QueryBuf,
    ) -> Result<Option<Row>, sqlx::Error> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_json(entity, &r)))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn list(
        &self,
        entity: &ResolvedEntity,
        filter: Option<(&str, &Value)>,
    ) -> Result<Vec<Row>, AppError> {
        let filter = match filter {
            Some((name, value)) => {
                let col = entity
                    .column(name)
                    .ok_or_else(|| AppError::Internal(format!("unknown column {}", name)))?;
                Some((col, value))
            }
            None => None,
        };
        let q = sql::select_list(entity, filter);
        self.fetch_all(entity, &q).await
    }

    async fn read(&self, entity: &ResolvedEntity, id: i64) -> Result<Option<Row>, AppError> {
        let q = sql::select_by_id(entity, id);
        Ok(self.fetch_optional(entity, &q).await?)
    }

    async fn read_many(&self, entity: &ResolvedEntity, ids: &[i64]) -> Result<Vec<Row>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let q = sql::select_by_ids(entity, ids);
        self.fetch_all(entity, &q).await
    }

    async fn create(&self, entity: &ResolvedEntity, fields: &Row) -> Result<Row, AppError> {
        let q = sql::insert(entity, fields);
        self.fetch_optional(entity, &q)
            .await
            .map_err(|e| map_write_error(entity, fields, e))?
            .ok_or_else(|| AppError::Internal("insert returned no row".into()))
    }

    async fn update(
        &self,
        entity: &ResolvedEntity,
        id: i64,
        fields: &Row,
    ) -> Result<Option<Row>, AppError> {
        let q = sql::update(entity, id, fields);
        self.fetch_optional(entity, &q)
            .await
            .map_err(|e| map_write_error(entity, fields, e))
    }

    async fn delete(&self, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError> {
        let q = sql::delete(entity, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let deleted = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await;
        match deleted {
            Ok(row) => Ok(row.is_some()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                let referrer = db
                    .table()
                    .map(str::to_string)
                    .or_else(|| entity.referenced_by.first().map(|r| r.table.clone()))
                    .unwrap_or_else(|| "other rows".into());
                Err(AppError::Conflict(restrict_message(entity, id, &referrer)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, AppError> {
        let inserted: Result<UserTuple, sqlx::Error> = sqlx::query_as(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, name, email, password_hash, created_at",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await;
        match inserted {
            Ok(t) => Ok(user_from_tuple(t)),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(AppError::Conflict(EMAIL_TAKEN.into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let row: Option<UserTuple> = sqlx::query_as(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(user_from_tuple))
    }

    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, AppError> {
        let row: Option<UserTuple> = sqlx::query_as(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(user_from_tuple))
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, AppError> {
        let rows: Vec<UserTuple> = sqlx::query_as(
            "SELECT id, name, email, password_hash, created_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(user_from_tuple).collect())
    }
}

fn user_from_tuple((id, name, email, password_hash, created_at): UserTuple) -> UserRecord {
    UserRecord {
        id,
        name,
        email,
        password_hash,
        created_at,
    }
}

/// Translate constraint violations on INSERT/UPDATE into API errors using the model's
/// constraint names.
fn map_write_error(entity: &ResolvedEntity, fields: &Row, err: sqlx::Error) -> AppError {
    let sqlx::Error::Database(db) = &err else {
        return err.into();
    };
    let constraint = db.constraint().unwrap_or_default();
    match db.code().as_deref() {
        Some(UNIQUE_VIOLATION) => {
            let message = entity
                .unique_by_constraint(constraint)
                .map(|u| u.conflict_message())
                .unwrap_or_else(|| format!("{} already exists", entity.label));
            AppError::Conflict(message)
        }
        Some(FOREIGN_KEY_VIOLATION) => match entity.reference_by_constraint(constraint) {
            Some(r) => AppError::Reference(reference_message(
                &r.column,
                fields.get(&r.column).unwrap_or(&Value::Null),
                &r.target_label,
            )),
            None => AppError::Reference(format!("{} references a missing row", entity.label)),
        },
        Some(NOT_NULL_VIOLATION) => {
            let column = db
                .try_downcast_ref::<PgDatabaseError>()
                .and_then(|pg| pg.column())
                .unwrap_or("a required column");
            AppError::Validation(format!("{} cannot be null", column))
        }
        _ => err.into(),
    }
}

fn row_to_json(entity: &ResolvedEntity, row: &PgRow) -> Row {
    let mut map = Row::new();
    for col in &entity.columns {
        let name = col.name.as_str();
        let value = match col.kind {
            FieldKind::Id => row.try_get::<Option<i64>, _>(name).ok().flatten().map(Value::from),
            FieldKind::Integer => row.try_get::<Option<i32>, _>(name).ok().flatten().map(Value::from),
            FieldKind::Text => row.try_get::<Option<String>, _>(name).ok().flatten().map(Value::from),
            FieldKind::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(name)
                .ok()
                .flatten()
                .map(|d| Value::String(d.to_rfc3339())),
        };
        map.insert(name.to_string(), value.unwrap_or(Value::Null));
    }
    map
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::Internal(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&mut conn)
            .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::Internal("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}
