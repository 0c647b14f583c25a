//! Convert serde_json::Value into values sqlx can bind.

use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value that can be bound to a PostgreSQL query. Placeholders carry an explicit cast
/// (`$1::bigint`), so each variant binds with its natural wire type.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    I64Array(Vec<i64>),
    Json(Value),
}

impl PgBindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => PgBindValue::I64(i),
                (None, Some(f)) => PgBindValue::F64(f),
                (None, None) => PgBindValue::String(n.to_string()),
            },
            Value::String(s) => PgBindValue::String(s.clone()),
            Value::Array(items) if items.iter().all(Value::is_i64) => {
                PgBindValue::I64Array(items.iter().filter_map(Value::as_i64).collect())
            }
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        }
    }

    pub fn bind<'q>(
        self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            PgBindValue::Null => query.bind(None::<String>),
            PgBindValue::Bool(b) => query.bind(b),
            PgBindValue::I64(n) => query.bind(n),
            PgBindValue::F64(n) => query.bind(n),
            PgBindValue::String(s) => query.bind(s),
            PgBindValue::I64Array(ids) => query.bind(ids),
            PgBindValue::Json(v) => query.bind(sqlx::types::Json(v)),
        }
    }
}

/// Bind every parameter in order.
pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = PgBindValue::from_json(p).bind(query);
    }
    query
}
