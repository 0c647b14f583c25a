//! Generic CRUD over any store, parameterized by the resolved entity model.

use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use crate::service::RequestValidator;
use crate::store::{Row, Store};
use serde_json::Value;
use std::collections::HashMap;

pub struct CrudService;

impl CrudService {
    /// All rows ordered by id, with configured relations embedded.
    pub async fn list(
        store: &dyn Store,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
    ) -> Result<Vec<Row>, AppError> {
        let mut rows = store.list(entity, None).await?;
        Self::embed(store, model, entity, &mut rows).await?;
        Ok(rows)
    }

    /// One row by id with relations embedded.
    pub async fn read(
        store: &dyn Store,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        id: i64,
    ) -> Result<Row, AppError> {
        let row = store
            .read(entity, id)
            .await?
            .ok_or_else(|| AppError::NotFound(entity.not_found()))?;
        let mut rows = vec![row];
        Self::embed(store, model, entity, &mut rows).await?;
        rows.pop()
            .ok_or_else(|| AppError::Internal("embedding dropped the row".into()))
    }

    /// Rows of `child_path` whose reference column points at `parent` row `id`.
    pub async fn list_children(
        store: &dyn Store,
        model: &ResolvedModel,
        parent: &ResolvedEntity,
        id: i64,
        child_path: &str,
    ) -> Result<Vec<Row>, AppError> {
        let referrer = parent
            .referenced_by
            .iter()
            .find(|r| r.path_segment == child_path)
            .ok_or_else(|| AppError::NotFound(format!("Unknown resource: {}", child_path)))?;
        let child = model
            .entity_by_path(child_path)
            .ok_or_else(|| AppError::NotFound(format!("Unknown resource: {}", child_path)))?;
        if store.read(parent, id).await?.is_none() {
            return Err(AppError::NotFound(parent.not_found()));
        }
        let key = Value::from(id);
        let mut rows = store.list(child, Some((referrer.column.as_str(), &key))).await?;
        Self::embed(store, model, child, &mut rows).await?;
        Ok(rows)
    }

    /// Validate and insert. Validation failures return before the store is touched.
    pub async fn create(
        store: &dyn Store,
        entity: &ResolvedEntity,
        body: &Value,
    ) -> Result<Row, AppError> {
        let row = RequestValidator::normalize(entity, body)?;
        RequestValidator::validate(entity, &row)?;
        store.create(entity, &row).await
    }

    /// PATCH: only supplied fields change.
    pub async fn update(
        store: &dyn Store,
        entity: &ResolvedEntity,
        id: i64,
        body: &Value,
    ) -> Result<Row, AppError> {
        let row = RequestValidator::normalize(entity, body)?;
        RequestValidator::validate_partial(entity, &row)?;
        store
            .update(entity, id, &row)
            .await?
            .ok_or_else(|| AppError::NotFound(entity.not_found()))
    }

    /// PUT: required fields must be present and every writable column is written. Omitted
    /// columns fall back to their default, or null when they have none.
    pub async fn replace(
        store: &dyn Store,
        entity: &ResolvedEntity,
        id: i64,
        body: &Value,
    ) -> Result<Row, AppError> {
        let mut row = RequestValidator::normalize(entity, body)?;
        RequestValidator::validate(entity, &row)?;
        for col in entity.writable_columns() {
            if !row.contains_key(&col.name) {
                let value = col.default_value();
                if value.is_null() && !col.nullable {
                    continue;
                }
                row.insert(col.name.clone(), value);
            }
        }
        store
            .update(entity, id, &row)
            .await?
            .ok_or_else(|| AppError::NotFound(entity.not_found()))
    }

    pub async fn delete(
        store: &dyn Store,
        entity: &ResolvedEntity,
        id: i64,
    ) -> Result<(), AppError> {
        if store.delete(entity, id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(entity.not_found()))
        }
    }

    /// Batch-load each embedded relation with one `read_many` and attach it under the
    /// reference name. A null FK embeds `null`.
    async fn embed(
        store: &dyn Store,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        rows: &mut [Row],
    ) -> Result<(), AppError> {
        for name in &entity.embed {
            let Some(reference) = entity.reference(name) else {
                continue;
            };
            let target = model.entity_by_path(&reference.target_path).ok_or_else(|| {
                AppError::Internal(format!("unknown embed target {}", reference.target_path))
            })?;
            let mut ids: Vec<i64> = rows
                .iter()
                .filter_map(|r| r.get(&reference.column).and_then(Value::as_i64))
                .collect();
            ids.sort_unstable();
            ids.dedup();
            let related: HashMap<i64, Row> = store
                .read_many(target, &ids)
                .await?
                .into_iter()
                .filter_map(|r| r.get("id").and_then(Value::as_i64).map(|id| (id, r)))
                .collect();
            for row in rows.iter_mut() {
                let embedded = row
                    .get(&reference.column)
                    .and_then(Value::as_i64)
                    .and_then(|id| related.get(&id))
                    .map(|r| Value::Object(r.clone()))
                    .unwrap_or(Value::Null);
                row.insert(name.clone(), embedded);
            }
        }
        Ok(())
    }
}
