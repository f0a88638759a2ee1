//! Typed extraction of column values from JSON store records.

use sea_orm::entity::prelude::Json;
use serde_json::Value;

use crate::errors::{StoreError, StoreResult};
use crate::hierarchy::GpsPoint;

fn invalid(table: &str, field: &str, expected: &str, value: &Value) -> StoreError {
    StoreError::InvalidRecord(format!(
        "{}.{} expects {}, got {}",
        table, field, expected, value
    ))
}

pub fn string(table: &str, field: &str, value: &Value) -> StoreResult<String> {
    value
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| invalid(table, field, "a string", value))
}

pub fn non_empty_string(table: &str, field: &str, value: &Value) -> StoreResult<String> {
    let s = string(table, field, value)?;
    if s.is_empty() {
        return Err(invalid(table, field, "a non-empty string", value));
    }
    Ok(s)
}

pub fn opt_string(table: &str, field: &str, value: &Value) -> StoreResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        _ => string(table, field, value).map(Some),
    }
}

pub fn opt_i32(table: &str, field: &str, value: &Value) -> StoreResult<Option<i32>> {
    match value {
        Value::Null => Ok(None),
        _ => value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(table, field, "an integer id", value)),
    }
}

/// Compliance scores, 0 to 100
pub fn opt_score(table: &str, field: &str, value: &Value) -> StoreResult<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        _ => value
            .as_f64()
            .filter(|score| (0.0..=100.0).contains(score))
            .map(Some)
            .ok_or_else(|| invalid(table, field, "a number between 0 and 100", value)),
    }
}

pub fn opt_json(value: &Value) -> Option<Json> {
    match value {
        Value::Null => None,
        other => Some(other.clone()),
    }
}

/// Accepts any form [`GpsPoint`] reads and stores the object form
pub fn opt_point(table: &str, field: &str, value: &Value) -> StoreResult<Option<Json>> {
    match value {
        Value::Null => Ok(None),
        _ => {
            let point: GpsPoint = serde_json::from_value(value.clone())
                .map_err(|e| StoreError::InvalidRecord(format!("{}.{}: {}", table, field, e)))?;
            Ok(Some(serde_json::to_value(point)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_opt_i32() {
        assert_eq!(opt_i32("sites", "parent_id", &json!(4)).unwrap(), Some(4));
        assert_eq!(opt_i32("sites", "parent_id", &Value::Null).unwrap(), None);
        assert!(opt_i32("sites", "parent_id", &json!("4")).is_err());
        assert!(opt_i32("sites", "parent_id", &json!(1u64 << 40)).is_err());
    }

    #[test]
    fn test_opt_score_bounds() {
        assert_eq!(opt_score("staff", "compliance", &json!(100)).unwrap(), Some(100.0));
        assert!(opt_score("staff", "compliance", &json!(-1)).is_err());
        assert!(opt_score("staff", "compliance", &json!(100.5)).is_err());
    }

    #[test]
    fn test_opt_point_normalizes_text() {
        let stored = opt_point("sites", "gps_coordinates", &json!("(10.5, 20.25)")).unwrap();
        assert_eq!(stored, Some(json!({"latitude": 10.5, "longitude": 20.25})));
        assert!(opt_point("sites", "gps_coordinates", &json!("nowhere")).is_err());
    }

    #[test]
    fn test_non_empty_string() {
        assert_eq!(non_empty_string("sites", "name", &json!(" HQ ")).unwrap(), "HQ");
        assert!(non_empty_string("sites", "name", &json!("   ")).is_err());
        assert!(non_empty_string("sites", "name", &Value::Null).is_err());
    }
}
