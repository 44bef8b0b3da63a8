//! Conversions from stored values to typed results.
//!
//! Stored values are loose: numbers may arrive as strings from flat sources
//! and booleans as `yes`/`on`. Multi-valued properties convert through their
//! first element.

use serde_json::Value;

use crate::error::{Error, Result};

fn first(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first(),
        other => Some(other),
    }
}

fn conversion_error(key: &str, target: &'static str, value: &Value) -> Error {
    Error::Conversion {
        key: key.to_string(),
        target,
        value: value.to_string(),
    }
}

pub fn to_string(key: &str, value: &Value) -> Result<String> {
    match first(value) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        _ => Err(conversion_error(key, "string", value)),
    }
}

pub fn to_i64(key: &str, value: &Value) -> Result<i64> {
    let converted = match first(value) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    converted.ok_or_else(|| conversion_error(key, "integer", value))
}

pub fn to_f64(key: &str, value: &Value) -> Result<f64> {
    let converted = match first(value) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    converted.ok_or_else(|| conversion_error(key, "float", value))
}

pub fn to_bool(key: &str, value: &Value) -> Result<bool> {
    let converted = match first(value) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Some(true),
            "false" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    };
    converted.ok_or_else(|| conversion_error(key, "boolean", value))
}

/// Flatten a value into the scalars stored in tree nodes.
///
/// Arrays contribute each element, nulls contribute nothing, objects are
/// rejected.
pub(crate) fn scalars(key: &str, value: Value) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    push_scalars(key, value, &mut out)?;
    Ok(out)
}

fn push_scalars(key: &str, value: Value, out: &mut Vec<Value>) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => items.into_iter().try_for_each(|v| push_scalars(key, v, out)),
        Value::Object(_) => Err(cfgtree_node::TreeError::NonScalarValue(key.to_string()).into()),
        scalar => {
            out.push(scalar);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool_words() {
        assert!(to_bool("k", &json!("Yes")).unwrap());
        assert!(to_bool("k", &json!("on")).unwrap());
        assert!(!to_bool("k", &json!("OFF")).unwrap());
        assert!(to_bool("k", &json!(true)).unwrap());
        assert!(to_bool("k", &json!("maybe")).is_err());
    }

    #[test]
    fn test_numbers_from_strings() {
        assert_eq!(to_i64("k", &json!(" 42 ")).unwrap(), 42);
        assert_eq!(to_f64("k", &json!("2.5")).unwrap(), 2.5);
        assert_eq!(to_i64("k", &json!(7)).unwrap(), 7);
    }

    #[test]
    fn test_list_uses_first_element() {
        assert_eq!(to_string("k", &json!(["a", "b"])).unwrap(), "a");
        assert!(to_string("k", &json!([])).is_err());
    }

    #[test]
    fn test_conversion_error_names_key() {
        let err = to_i64("db.port", &json!("abc")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("db.port"));
        assert!(msg.contains("integer"));
    }

    #[test]
    fn test_scalars_flatten_and_reject_objects() {
        assert_eq!(
            scalars("k", json!([1, [2, null], "x"])).unwrap(),
            vec![json!(1), json!(2), json!("x")]
        );
        assert!(scalars("k", json!({"a": 1})).is_err());
        assert!(scalars("k", Value::Null).unwrap().is_empty());
    }
}
