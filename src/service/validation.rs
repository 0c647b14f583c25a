//! Request validation from entity rules: normalize the body to known writable columns, then
//! check required fields and per-column rules before anything reaches the store.

use crate::config::{ColumnInfo, FieldKind, ResolvedEntity, ValidationRule};
use crate::error::AppError;
use crate::store::Row;
use regex::Regex;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Keep only writable model columns and coerce values to their column kind. Integer
    /// columns accept numeric strings; a blank string becomes null.
    pub fn normalize(entity: &ResolvedEntity, body: &Value) -> Result<Row, AppError> {
        let Some(obj) = body.as_object() else {
            return Err(AppError::Validation(
                "Request body must be a JSON object".into(),
            ));
        };
        let mut row = Row::new();
        for col in entity.writable_columns() {
            if let Some(v) = obj.get(&col.name) {
                row.insert(col.name.clone(), coerce(col, v)?);
            }
        }
        Ok(row)
    }

    /// Full validation (create, replace): every required field must be present and non-blank.
    pub fn validate(entity: &ResolvedEntity, row: &Row) -> Result<(), AppError> {
        for col in entity.writable_columns() {
            let Some(rule) = entity.validation.get(&col.name) else {
                continue;
            };
            let val = row.get(&col.name);
            if rule.required == Some(true) && val.map_or(true, is_blank) {
                return Err(required(&col.name));
            }
            if let Some(v) = val {
                validate_field(&col.name, v, rule)?;
            }
        }
        reject_nulls(entity, row)
    }

    /// Validate only the fields present in the body (PATCH). A required field may be omitted
    /// but not cleared.
    pub fn validate_partial(entity: &ResolvedEntity, row: &Row) -> Result<(), AppError> {
        for (col, v) in row {
            let Some(rule) = entity.validation.get(col) else {
                continue;
            };
            if rule.required == Some(true) && is_blank(v) {
                return Err(required(col));
            }
            validate_field(col, v, rule)?;
        }
        reject_nulls(entity, row)
    }
}

/// An explicit null on a NOT NULL column is a client error, not a store failure.
fn reject_nulls(entity: &ResolvedEntity, row: &Row) -> Result<(), AppError> {
    for (name, v) in row {
        if v.is_null() && entity.column(name).is_some_and(|c| !c.nullable) {
            return Err(not_null(name));
        }
    }
    Ok(())
}

fn not_null(col: &str) -> AppError {
    AppError::Validation(format!("{} cannot be null", col))
}

fn required(col: &str) -> AppError {
    AppError::Validation(format!("{} is required", col))
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn coerce(col: &ColumnInfo, v: &Value) -> Result<Value, AppError> {
    match col.kind {
        FieldKind::Integer | FieldKind::Id => coerce_integer(col, v),
        FieldKind::Text => match v {
            Value::Null | Value::String(_) => Ok(v.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            _ => Err(AppError::Validation(format!("{} must be a string", col.name))),
        },
        FieldKind::Timestamp => Ok(v.clone()),
    }
}

fn coerce_integer(col: &ColumnInfo, v: &Value) -> Result<Value, AppError> {
    let not_integer = || AppError::Validation(format!("{} must be an integer", col.name));
    let n = match v {
        Value::Null => return Ok(Value::Null),
        Value::Number(n) => n.as_i64().ok_or_else(not_integer)?,
        Value::String(s) if s.trim().is_empty() => return Ok(Value::Null),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| not_integer())?,
        _ => return Err(not_integer()),
    };
    if col.kind == FieldKind::Integer && i32::try_from(n).is_err() {
        return Err(AppError::Validation(format!("{} is out of range", col.name)));
    }
    Ok(Value::from(n))
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
        if let Some(pattern) = &rule.pattern {
            let re = Regex::new(pattern)
                .map_err(|e| AppError::Internal(format!("pattern for {}: {}", col, e)))?;
            if !re.is_match(s) {
                let message = match &rule.pattern_hint {
                    Some(hint) => format!("Invalid {}. {}", col, hint),
                    None => format!("{} does not match required pattern", col),
                };
                return Err(AppError::Validation(message));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| a == v) {
            let names: Vec<String> = allowed
                .iter()
                .map(|a| a.as_str().map(str::to_string).unwrap_or_else(|| a.to_string()))
                .collect();
            return Err(AppError::Validation(format!(
                "{} must be one of: {}",
                col,
                names.join(", ")
            )));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    if format.eq_ignore_ascii_case("email") {
        if let Some(s) = v.as_str() {
            let valid = s
                .split_once('@')
                .is_some_and(|(local, domain)| {
                    !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
                        && !domain.ends_with('.') && !s.contains(char::is_whitespace)
                });
            if !valid {
                return Err(AppError::Validation(format!("{} must be a valid email", col)));
            }
        }
    }
    Ok(())
}
