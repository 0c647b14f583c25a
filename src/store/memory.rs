//! In-memory store. One lock guards every table so reference, uniqueness and restrict checks
//! see the same snapshot as the write they guard.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::store::{
    reference_message, restrict_message, NewUser, Row, Store, UserRecord, EMAIL_TAKEN,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    rows: HashMap<String, BTreeMap<i64, Row>>,
    next_id: HashMap<String, i64>,
    users: Vec<UserRecord>,
}

impl Tables {
    fn table(&self, name: &str) -> Option<&BTreeMap<i64, Row>> {
        self.rows.get(name)
    }

    fn allocate_id(&mut self, table: &str) -> i64 {
        let next = self.next_id.entry(table.to_string()).or_insert(1);
        let id = *next;
        *next += 1;
        id
    }

    fn check_references(&self, entity: &ResolvedEntity, row: &Row) -> Result<(), AppError> {
        for r in &entity.references {
            let value = row.get(&r.column).unwrap_or(&Value::Null);
            if value.is_null() {
                continue;
            }
            let exists = value
                .as_i64()
                .and_then(|id| self.table(&r.target_table).map(|t| t.contains_key(&id)))
                .unwrap_or(false);
            if !exists {
                return Err(AppError::Reference(reference_message(
                    &r.column,
                    value,
                    &r.target_label,
                )));
            }
        }
        Ok(())
    }

    /// NULLs never collide, matching PostgreSQL UNIQUE semantics.
    fn check_unique(
        &self,
        entity: &ResolvedEntity,
        row: &Row,
        skip_id: Option<i64>,
    ) -> Result<(), AppError> {
        let Some(existing) = self.table(&entity.table_name) else {
            return Ok(());
        };
        for constraint in &entity.unique {
            let key: Vec<&Value> = constraint
                .columns
                .iter()
                .map(|c| row.get(c).unwrap_or(&Value::Null))
                .collect();
            if key.iter().any(|v| v.is_null()) {
                continue;
            }
            let clash = existing.iter().any(|(id, other)| {
                Some(*id) != skip_id
                    && constraint
                        .columns
                        .iter()
                        .zip(&key)
                        .all(|(c, v)| other.get(c) == Some(*v))
            });
            if clash {
                return Err(AppError::Conflict(constraint.conflict_message()));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn list(
        &self,
        entity: &ResolvedEntity,
        filter: Option<(&str, &Value)>,
    ) -> Result<Vec<Row>, AppError> {
        let tables = self.tables.read().await;
        let Some(table) = tables.table(&entity.table_name) else {
            return Ok(Vec::new());
        };
        Ok(table
            .values()
            .filter(|row| match filter {
                Some((column, value)) => row.get(column) == Some(value),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn read(&self, entity: &ResolvedEntity, id: i64) -> Result<Option<Row>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .table(&entity.table_name)
            .and_then(|t| t.get(&id))
            .cloned())
    }

    async fn read_many(&self, entity: &ResolvedEntity, ids: &[i64]) -> Result<Vec<Row>, AppError> {
        let tables = self.tables.read().await;
        let Some(table) = tables.table(&entity.table_name) else {
            return Ok(Vec::new());
        };
        Ok(table
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn create(&self, entity: &ResolvedEntity, fields: &Row) -> Result<Row, AppError> {
        let mut tables = self.tables.write().await;
        let mut row = Row::new();
        for col in &entity.columns {
            if col.name == "id" {
                continue;
            }
            let supplied = if col.read_only { None } else { fields.get(&col.name) };
            let value = match supplied {
                Some(v) => v.clone(),
                None => col.default_value(),
            };
            row.insert(col.name.clone(), value);
        }
        tables.check_references(entity, &row)?;
        tables.check_unique(entity, &row, None)?;

        let id = tables.allocate_id(&entity.table_name);
        let mut stored = Row::new();
        stored.insert("id".into(), Value::from(id));
        for col in &entity.columns {
            if let Some(v) = row.remove(&col.name) {
                stored.insert(col.name.clone(), v);
            }
        }
        tables
            .rows
            .entry(entity.table_name.clone())
            .or_default()
            .insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        entity: &ResolvedEntity,
        id: i64,
        fields: &Row,
    ) -> Result<Option<Row>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.table(&entity.table_name).and_then(|t| t.get(&id)) else {
            return Ok(None);
        };
        let mut merged = current.clone();
        for col in entity.writable_columns() {
            if let Some(v) = fields.get(&col.name) {
                merged.insert(col.name.clone(), v.clone());
            }
        }
        tables.check_references(entity, &merged)?;
        tables.check_unique(entity, &merged, Some(id))?;
        tables
            .rows
            .entry(entity.table_name.clone())
            .or_default()
            .insert(id, merged.clone());
        Ok(Some(merged))
    }

    async fn delete(&self, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .table(&entity.table_name)
            .is_some_and(|t| t.contains_key(&id));
        if !exists {
            return Ok(false);
        }
        let key = Value::from(id);
        for referrer in &entity.referenced_by {
            let referenced = tables
                .table(&referrer.table)
                .is_some_and(|t| t.values().any(|row| row.get(&referrer.column) == Some(&key)));
            if referenced {
                return Err(AppError::Conflict(restrict_message(
                    entity,
                    id,
                    &referrer.table,
                )));
            }
        }
        if let Some(table) = tables.rows.get_mut(&entity.table_name) {
            table.remove(&id);
        }
        Ok(true)
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(EMAIL_TAKEN.into()));
        }
        let record = UserRecord {
            id: tables.allocate_id("users"),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.push(record.clone());
        Ok(record)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, AppError> {
        Ok(self.tables.read().await.users.clone())
    }
}
