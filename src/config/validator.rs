//! Model validation: references, operations and rule consistency.

use crate::config::{FieldKind, FullConfig, OPERATIONS};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;

/// Served by fixed routes next to the entity routes.
const RESERVED_PATHS: &[&str] = &["users", "auth", "openapi.json"];

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    if config.entities.is_empty() {
        return Err(ConfigError::Validation("at least one entity required".into()));
    }
    let mut seen_paths: HashSet<&str> = HashSet::new();
    let mut seen_tables: HashSet<&str> = HashSet::new();

    for e in &config.entities {
        let fields: HashSet<&str> = e.fields.iter().map(|f| f.name.as_str()).collect();

        match e.fields.iter().find(|f| f.name == "id") {
            Some(f) if f.kind == FieldKind::Id && f.read_only => {}
            _ => {
                return Err(ConfigError::Validation(format!(
                    "{}: a read-only 'id' field of type id is required",
                    e.table
                )))
            }
        }

        for op in &e.operations {
            if !OPERATIONS.contains(&op.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{}: unknown operation '{}'",
                    e.table, op
                )));
            }
        }

        for group in &e.unique {
            for col in group {
                if !fields.contains(col.as_str()) {
                    return Err(ConfigError::MissingReference {
                        kind: "unique column",
                        id: format!("{}.{}", e.table, col),
                    });
                }
            }
        }

        for r in &e.references {
            if !seen_paths.contains(r.entity.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "entity",
                    id: r.entity.clone(),
                });
            }
            match e.fields.iter().find(|f| f.name == r.column) {
                Some(f) if f.kind == FieldKind::Id => {}
                Some(_) => {
                    return Err(ConfigError::Validation(format!(
                        "{}.{}: reference columns must be of type id",
                        e.table, r.column
                    )))
                }
                None => {
                    return Err(ConfigError::MissingReference {
                        kind: "column",
                        id: format!("{}.{}", e.table, r.column),
                    })
                }
            }
        }

        for name in &e.embed {
            if !e.references.iter().any(|r| &r.name == name) {
                return Err(ConfigError::MissingReference {
                    kind: "reference",
                    id: format!("{}.{}", e.table, name),
                });
            }
        }

        for (col, rule) in &e.validation {
            if !fields.contains(col.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "validated column",
                    id: format!("{}.{}", e.table, col),
                });
            }
            if let Some(pattern) = &rule.pattern {
                Regex::new(pattern).map_err(|err| {
                    ConfigError::Validation(format!("{}.{}: bad pattern: {}", e.table, col, err))
                })?;
            }
        }

        if RESERVED_PATHS.contains(&e.path_segment.as_str()) {
            return Err(ConfigError::Validation(format!(
                "path segment '{}' is reserved",
                e.path_segment
            )));
        }
        if !seen_paths.insert(e.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(e.path_segment.clone()));
        }
        if !seen_tables.insert(e.table.as_str()) || e.table == "users" {
            return Err(ConfigError::Validation(format!("duplicate table name: {}", e.table)));
        }
    }
    Ok(())
}
