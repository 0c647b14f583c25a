//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resolved entity.

use crate::config::{ColumnInfo, ResolvedEntity};
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from the entity model).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

fn placeholder(n: usize, column: &ColumnInfo) -> String {
    format!("${}::{}", n, column.pg_type())
}

fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT all rows ordered by id, optionally restricted to `column = value`.
pub fn select_list(entity: &ResolvedEntity, filter: Option<(&ColumnInfo, &Value)>) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_clause = match filter {
        Some((col, val)) => {
            let n = q.push_param(val.clone());
            format!(" WHERE {} = {}", quoted(&col.name), placeholder(n, col))
        }
        None => String::new(),
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}",
        select_column_list(entity),
        quoted(&entity.table_name),
        where_clause,
        quoted("id")
    );
    q
}

/// SELECT by primary key.
pub fn select_by_id(entity: &ResolvedEntity, id: i64) -> QueryBuf {
    QueryBuf {
        sql: format!(
            "SELECT {} FROM {} WHERE {} = $1",
            select_column_list(entity),
            quoted(&entity.table_name),
            quoted("id")
        ),
        params: vec![Value::from(id)],
    }
}

/// SELECT rows whose id is in `ids`. Used to batch-load embedded relations.
pub fn select_by_ids(entity: &ResolvedEntity, ids: &[i64]) -> QueryBuf {
    QueryBuf {
        sql: format!(
            "SELECT {} FROM {} WHERE {} = ANY($1::bigint[]) ORDER BY {}",
            select_column_list(entity),
            quoted(&entity.table_name),
            quoted("id"),
            quoted("id")
        ),
        params: vec![Value::from(ids.to_vec())],
    }
}

/// INSERT the writable columns present in `fields`; absent columns take the DB default.
pub fn insert(entity: &ResolvedEntity, fields: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::default();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in entity.writable_columns() {
        let Some(val) = fields.get(&c.name) else { continue };
        let n = q.push_param(val.clone());
        cols.push(quoted(&c.name));
        placeholders.push(placeholder(n, c));
    }
    let returning = select_column_list(entity);
    let table = quoted(&entity.table_name);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only writable columns present in `fields`. With nothing to set this
/// degrades to a SELECT so callers still get the current row (or none).
pub fn update(entity: &ResolvedEntity, id: i64, fields: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::default();
    let mut sets = Vec::new();
    for c in entity.writable_columns() {
        let Some(val) = fields.get(&c.name) else { continue };
        let n = q.push_param(val.clone());
        sets.push(format!("{} = {}", quoted(&c.name), placeholder(n, c)));
    }
    if sets.is_empty() {
        return select_by_id(entity, id);
    }
    let id_param = q.push_param(Value::from(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
        quoted(&entity.table_name),
        sets.join(", "),
        quoted("id"),
        id_param,
        select_column_list(entity)
    );
    q
}

/// DELETE by id, returning the id when a row was removed.
pub fn delete(entity: &ResolvedEntity, id: i64) -> QueryBuf {
    QueryBuf {
        sql: format!(
            "DELETE FROM {} WHERE {} = $1 RETURNING {}",
            quoted(&entity.table_name),
            quoted("id"),
            quoted("id")
        ),
        params: vec![Value::from(id)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin_config, resolve, ResolvedModel};
    use serde_json::json;

    fn model() -> ResolvedModel {
        resolve(&builtin_config().expect("builtin")).expect("model")
    }

    #[test]
    fn insert_skips_absent_and_read_only_columns() {
        let model = model();
        let courses = model.entity_by_path("courses").expect("courses");
        let fields = json!({ "title": "Algebra", "course_code": "MTH101", "id": 99 });
        let q = insert(courses, fields.as_object().expect("object"));
        assert_eq!(
            q.sql,
            "INSERT INTO \"courses\" (\"title\", \"course_code\") VALUES ($1::text, $2::text) \
             RETURNING \"id\", \"title\", \"course_code\", \"description\", \"credit_hours\", \
             \"max_capacity\", \"instructor_id\", \"created_at\""
        );
        assert_eq!(q.params, vec![json!("Algebra"), json!("MTH101")]);
    }

    #[test]
    fn update_sets_only_supplied_columns() {
        let model = model();
        let students = model.entity_by_path("students").expect("students");
        let fields = json!({ "major": "Physics" });
        let q = update(students, 4, fields.as_object().expect("object"));
        assert!(q.sql.starts_with("UPDATE \"students\" SET \"major\" = $1::text WHERE \"id\" = $2"));
        assert_eq!(q.params, vec![json!("Physics"), json!(4)]);
    }

    #[test]
    fn empty_update_falls_back_to_select() {
        let model = model();
        let students = model.entity_by_path("students").expect("students");
        let q = update(students, 4, &Map::new());
        assert!(q.sql.starts_with("SELECT "));
        assert_eq!(q.params, vec![json!(4)]);
    }

    #[test]
    fn filtered_list_casts_placeholder() {
        let model = model();
        let enrollments = model.entity_by_path("enrollments").expect("enrollments");
        let col = enrollments.column("course_id").expect("course_id");
        let q = select_list(enrollments, Some((col, &json!(3))));
        assert!(q.sql.contains("WHERE \"course_id\" = $1::bigint ORDER BY \"id\""));
    }
}
