//! Apply the entity model to the database: the users table, one table per entity with its
//! unique constraints, then foreign keys. Every step is idempotent so the server can run it
//! on each start.

use crate::config::{ResolvedEntity, ResolvedModel, ResolvedReference};
use crate::error::AppError;
use crate::sql::quoted;
use sqlx::PgPool;

const USERS_DDL: &str = "CREATE TABLE IF NOT EXISTS \"users\" (
  \"id\" BIGSERIAL PRIMARY KEY,
  \"name\" text NOT NULL,
  \"email\" text NOT NULL,
  \"password_hash\" text NOT NULL,
  \"created_at\" timestamptz NOT NULL DEFAULT NOW(),
  CONSTRAINT \"users_email_key\" UNIQUE (\"email\")
)";

/// Create the users table, entity tables, and FKs (ON DELETE RESTRICT) that are not yet present.
pub async fn apply_migrations(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    sqlx::query(USERS_DDL).execute(pool).await?;

    for entity in &model.entities {
        let sql = create_table_sql(entity);
        tracing::debug!(table = %entity.table_name, sql = %sql, "create table");
        sqlx::query(&sql).execute(pool).await?;
    }

    for entity in &model.entities {
        for reference in &entity.references {
            let exists: (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_constraint WHERE conname = $1)")
                    .bind(&reference.constraint)
                    .fetch_one(pool)
                    .await?;
            if exists.0 {
                continue;
            }
            tracing::info!(constraint = %reference.constraint, "adding foreign key");
            sqlx::query(&foreign_key_sql(entity, reference))
                .execute(pool)
                .await?;
        }
    }

    Ok(())
}

fn create_table_sql(entity: &ResolvedEntity) -> String {
    let mut defs: Vec<String> = Vec::new();
    for c in &entity.columns {
        if c.name == "id" {
            defs.push(format!("{} BIGSERIAL PRIMARY KEY", quoted(&c.name)));
            continue;
        }
        let mut def = format!("{} {}", quoted(&c.name), c.pg_type());
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(d) = &c.default {
            def.push_str(" DEFAULT ");
            def.push_str(d);
        }
        defs.push(def);
    }
    for u in &entity.unique {
        let cols: Vec<String> = u.columns.iter().map(|s| quoted(s)).collect();
        defs.push(format!(
            "CONSTRAINT {} UNIQUE ({})",
            quoted(&u.name),
            cols.join(", ")
        ));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(&entity.table_name),
        defs.join(",\n  ")
    )
}

fn foreign_key_sql(entity: &ResolvedEntity, reference: &ResolvedReference) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE RESTRICT",
        quoted(&entity.table_name),
        quoted(&reference.constraint),
        quoted(&reference.column),
        quoted(&reference.target_table),
        quoted("id")
    )
}
