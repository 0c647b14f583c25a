//! Build the resolved model from the built-in entity definitions or a JSON model file.

use crate::config::resolved::{
    ColumnInfo, Referrer, ResolvedEntity, ResolvedModel, ResolvedReference, UniqueConstraint,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

/// Build resolved model from full config (validates first).
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let by_path: HashMap<&str, &EntityConfig> = config
        .entities
        .iter()
        .map(|e| (e.path_segment.as_str(), e))
        .collect();

    let mut referrers: HashMap<&str, Vec<Referrer>> = HashMap::new();
    for e in &config.entities {
        for r in &e.references {
            referrers.entry(r.entity.as_str()).or_default().push(Referrer {
                path_segment: e.path_segment.clone(),
                table: e.table.clone(),
                column: r.column.clone(),
            });
        }
    }

    let mut entities = Vec::new();
    let mut entity_by_path = HashMap::new();

    for e in &config.entities {
        let columns = e
            .fields
            .iter()
            .map(|f| ColumnInfo {
                name: f.name.clone(),
                kind: f.kind,
                nullable: f.nullable,
                has_default: f.default.is_some(),
                default: f.default.clone(),
                read_only: f.read_only,
            })
            .collect();

        let unique = e
            .unique
            .iter()
            .map(|cols| UniqueConstraint {
                name: format!("{}_{}_key", e.table, cols.join("_")),
                columns: cols.clone(),
            })
            .collect();

        let mut references = Vec::new();
        for r in &e.references {
            let target = by_path
                .get(r.entity.as_str())
                .ok_or_else(|| ConfigError::MissingReference {
                    kind: "entity",
                    id: r.entity.clone(),
                })?;
            references.push(ResolvedReference {
                name: r.name.clone(),
                column: r.column.clone(),
                target_path: target.path_segment.clone(),
                target_table: target.table.clone(),
                target_label: target.label.clone(),
                constraint: format!("{}_{}_fkey", e.table, r.column),
            });
        }

        let entity = ResolvedEntity {
            table_name: e.table.clone(),
            path_segment: e.path_segment.clone(),
            label: e.label.clone(),
            columns,
            operations: e.operations.clone(),
            unique,
            references,
            referenced_by: referrers.remove(e.path_segment.as_str()).unwrap_or_default(),
            embed: e.embed.clone(),
            validation: e.validation.clone(),
        };
        entity_by_path.insert(entity.path_segment.clone(), entity.clone());
        entities.push(entity);
    }

    Ok(ResolvedModel {
        entities,
        entity_by_path,
    })
}

/// Read a JSON model file (`{"entities": [...]}`).
pub async fn load_from_file(path: &Path) -> Result<FullConfig, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// The four CourseHub entities.
pub fn builtin_config() -> Result<FullConfig, ConfigError> {
    let all_ops = vec!["list", "read", "create", "update", "delete"];
    let entities = json!([
        {
            "table": "instructors",
            "path_segment": "instructors",
            "label": "Instructor",
            "operations": all_ops,
            "fields": [
                { "name": "id", "type": "id", "nullable": false, "read_only": true },
                { "name": "username", "type": "text", "nullable": false },
                { "name": "email", "type": "text", "nullable": false },
                { "name": "name", "type": "text", "nullable": false },
                { "name": "specialty", "type": "text" },
                { "name": "created_at", "type": "timestamp", "nullable": false, "default": "NOW()", "read_only": true }
            ],
            "validation": {
                "username": { "required": true, "max_length": 50 },
                "email": { "required": true, "format": "email", "max_length": 100 },
                "name": { "required": true, "max_length": 50 },
                "specialty": { "max_length": 100 }
            }
        },
        {
            "table": "courses",
            "path_segment": "courses",
            "label": "Course",
            "operations": all_ops,
            "fields": [
                { "name": "id", "type": "id", "nullable": false, "read_only": true },
                { "name": "title", "type": "text", "nullable": false },
                { "name": "course_code", "type": "text", "nullable": false },
                { "name": "description", "type": "text" },
                { "name": "credit_hours", "type": "integer" },
                { "name": "max_capacity", "type": "integer" },
                { "name": "instructor_id", "type": "id" },
                { "name": "created_at", "type": "timestamp", "nullable": false, "default": "NOW()", "read_only": true }
            ],
            "unique": [["course_code"]],
            "references": [
                { "name": "instructor", "column": "instructor_id", "entity": "instructors" }
            ],
            "embed": ["instructor"],
            "validation": {
                "title": { "required": true, "max_length": 50 },
                "course_code": { "required": true, "max_length": 10 },
                "description": { "max_length": 200 },
                "credit_hours": { "minimum": 1 },
                "max_capacity": { "minimum": 1 }
            }
        },
        {
            "table": "students",
            "path_segment": "students",
            "label": "Student",
            "operations": all_ops,
            "fields": [
                { "name": "id", "type": "id", "nullable": false, "read_only": true },
                { "name": "username", "type": "text", "nullable": false },
                { "name": "email", "type": "text", "nullable": false },
                { "name": "student_id", "type": "text", "nullable": false },
                { "name": "major", "type": "text" },
                { "name": "enrollment_year", "type": "integer" },
                { "name": "created_at", "type": "timestamp", "nullable": false, "default": "NOW()", "read_only": true }
            ],
            "unique": [["email"], ["student_id"]],
            "validation": {
                "username": { "required": true, "max_length": 50 },
                "email": { "required": true, "format": "email", "max_length": 100 },
                "student_id": { "required": true, "pattern": "^S\\d{3}$", "pattern_hint": "Format: S001" },
                "enrollment_year": { "minimum": 1900, "maximum": 2100 }
            }
        },
        {
            "table": "enrollments",
            "path_segment": "enrollments",
            "label": "Enrollment",
            "operations": all_ops,
            "fields": [
                { "name": "id", "type": "id", "nullable": false, "read_only": true },
                { "name": "student_id", "type": "id", "nullable": false },
                { "name": "course_id", "type": "id", "nullable": false },
                { "name": "semester", "type": "text", "nullable": false },
                { "name": "status", "type": "text", "nullable": false, "default": "'enrolled'" },
                { "name": "grade", "type": "text" },
                { "name": "enrolled_at", "type": "timestamp", "nullable": false, "default": "NOW()", "read_only": true }
            ],
            "unique": [["student_id", "course_id", "semester"]],
            "references": [
                { "name": "student", "column": "student_id", "entity": "students" },
                { "name": "course", "column": "course_id", "entity": "courses" }
            ],
            "embed": ["student", "course"],
            "validation": {
                "student_id": { "required": true },
                "course_id": { "required": true },
                "semester": { "required": true, "max_length": 20 },
                "status": { "allowed": ["enrolled", "completed", "dropped"] },
                "grade": { "max_length": 3 }
            }
        }
    ]);
    let entities: Vec<EntityConfig> = serde_json::from_value(entities)
        .map_err(|e| ConfigError::Load(format!("built-in model: {}", e)))?;
    Ok(FullConfig { entities })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_model_resolves() {
        let config = builtin_config().expect("builtin");
        assert_eq!(config.entities.len(), 4);
        let model = resolve(&config).expect("builtin model is valid");
        let enrollments = model.entity_by_path("enrollments").expect("enrollments");
        assert_eq!(enrollments.references.len(), 2);
        assert_eq!(enrollments.references[0].constraint, "enrollments_student_id_fkey");
        assert_eq!(
            enrollments.unique[0].name,
            "enrollments_student_id_course_id_semester_key"
        );
    }

    #[test]
    fn referrers_are_collected_on_targets() {
        let model = resolve(&builtin_config().expect("builtin")).expect("model");
        let students = model.entity_by_path("students").expect("students");
        assert_eq!(students.referenced_by.len(), 1);
        assert_eq!(students.referenced_by[0].table, "enrollments");
        let instructors = model.entity_by_path("instructors").expect("instructors");
        assert_eq!(instructors.referenced_by[0].column, "instructor_id");
    }

    #[test]
    fn rejects_forward_references() {
        let mut config = builtin_config().expect("builtin");
        config.entities.swap(0, 1);
        assert!(matches!(
            resolve(&config),
            Err(ConfigError::MissingReference { kind: "entity", .. })
        ));
    }

    #[test]
    fn rejects_unknown_embed() {
        let mut config = builtin_config().expect("builtin");
        config.entities[1].embed.push("teacher".into());
        assert!(resolve(&config).is_err());
    }

    #[test]
    fn rejects_duplicate_path_segment() {
        let mut config = builtin_config().expect("builtin");
        config.entities[3].path_segment = "students".into();
        assert!(matches!(
            resolve(&config),
            Err(ConfigError::DuplicatePathSegment(_))
        ));
    }

    #[tokio::test]
    async fn loads_model_from_json_file() {
        let path = std::env::temp_dir().join(format!("coursehub-model-{}.json", std::process::id()));
        let raw = serde_json::to_string(&builtin_config().expect("builtin")).expect("serialize");
        tokio::fs::write(&path, raw).await.expect("write");
        let loaded = load_from_file(&path).await.expect("load");
        assert_eq!(loaded.entities.len(), 4);
        let _ = tokio::fs::remove_file(&path).await;
    }
}
