//! Raw entity model types. Deserializable so a JSON model file can replace the built-in one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column type. Maps to a PostgreSQL type and to the JSON shape accepted in request bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Integer,
    Id,
    Timestamp,
}

impl FieldKind {
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Id => "bigint",
            FieldKind::Timestamp => "timestamptz",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// SQL default expression, e.g. `NOW()` or `'enrolled'`.
    #[serde(default)]
    pub default: Option<String>,
    /// Server-managed column; ignored in request bodies.
    #[serde(default)]
    pub read_only: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    /// Message used when `pattern` does not match.
    #[serde(default)]
    pub pattern_hint: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// Foreign key from one of our columns to another entity's `id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Key under which the referenced row is embedded (e.g. "student").
    pub name: String,
    pub column: String,
    /// Path segment of the referenced entity (e.g. "students").
    pub entity: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub table: String,
    pub path_segment: String,
    /// Human label used in messages ("Course not found").
    pub label: String,
    pub operations: Vec<String>,
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
    #[serde(default)]
    pub references: Vec<ReferenceConfig>,
    /// Reference names embedded in list/read responses.
    #[serde(default)]
    pub embed: Vec<String>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
}

/// Whole model in declaration order. Referenced entities must be declared first.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    pub entities: Vec<EntityConfig>,
}

pub const OPERATIONS: &[&str] = &["list", "read", "create", "update", "delete"];
