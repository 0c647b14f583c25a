//! Resolved entity model: config validated and flattened for runtime use.

use crate::config::{FieldKind, ValidationRule};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    /// Whether the column has a DB default (e.g. NOW()).
    pub has_default: bool,
    pub default: Option<String>,
    pub read_only: bool,
}

impl ColumnInfo {
    pub fn pg_type(&self) -> &'static str {
        self.kind.pg_type()
    }

    /// The column default as a JSON value (`NOW()`, `'enrolled'`, `0`). Null when there is none.
    pub fn default_value(&self) -> Value {
        let Some(raw) = self.default.as_deref() else {
            return Value::Null;
        };
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("now()") || raw.eq_ignore_ascii_case("current_timestamp") {
            return Value::String(Utc::now().to_rfc3339());
        }
        match self.kind {
            FieldKind::Integer | FieldKind::Id => {
                raw.parse::<i64>().map(Value::from).unwrap_or(Value::Null)
            }
            _ => Value::String(raw.trim_matches('\'').to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

impl UniqueConstraint {
    pub fn conflict_message(&self) -> String {
        format!("{} already exists", self.columns.join(", "))
    }
}

/// Our FK column pointing at another entity's `id`.
#[derive(Clone, Debug)]
pub struct ResolvedReference {
    pub name: String,
    pub column: String,
    pub target_path: String,
    pub target_table: String,
    pub target_label: String,
    pub constraint: String,
}

/// Another entity whose FK points at us. Drives delete restriction and child listings.
#[derive(Clone, Debug)]
pub struct Referrer {
    pub path_segment: String,
    pub table: String,
    pub column: String,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub table_name: String,
    pub path_segment: String,
    pub label: String,
    pub columns: Vec<ColumnInfo>,
    pub operations: Vec<String>,
    pub unique: Vec<UniqueConstraint>,
    pub references: Vec<ResolvedReference>,
    pub referenced_by: Vec<Referrer>,
    pub embed: Vec<String>,
    pub validation: HashMap<String, ValidationRule>,
}

impl ResolvedEntity {
    pub fn allows(&self, op: &str) -> bool {
        self.operations.iter().any(|o| o == op)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn writable_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| !c.read_only)
    }

    pub fn reference(&self, name: &str) -> Option<&ResolvedReference> {
        self.references.iter().find(|r| r.name == name)
    }

    pub fn reference_by_constraint(&self, constraint: &str) -> Option<&ResolvedReference> {
        self.references.iter().find(|r| r.constraint == constraint)
    }

    pub fn unique_by_constraint(&self, constraint: &str) -> Option<&UniqueConstraint> {
        self.unique.iter().find(|u| u.name == constraint)
    }

    pub fn not_found(&self) -> String {
        format!("{} not found", self.label)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub entities: Vec<ResolvedEntity>,
    pub entity_by_path: HashMap<String, ResolvedEntity>,
}

impl ResolvedModel {
    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.entity_by_path.get(path)
    }
}
