//! Field validation for table bodies.
//!
//! The accepted fields are described by [`FIELDS`], a plain table of field
//! name to expected kind. Creation checks every entry of the table,
//! patching checks only the entries present in the body; both go through
//! the same per-field rule.

use serde_json::{Map, Value};

use crate::record::TableFields;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Bool,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Str => "str",
            FieldKind::Int => "int",
            FieldKind::Bool => "bool",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Str => value.is_string(),
            // JSON booleans are never integers, unlike in some dynamic languages
            FieldKind::Int => value.is_i64() || value.is_u64(),
            FieldKind::Bool => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub non_empty: bool,
}

pub const FIELDS: &[Field] = &[
    Field {
        name: "name",
        kind: FieldKind::Str,
        non_empty: true,
    },
    Field {
        name: "size",
        kind: FieldKind::Int,
        non_empty: false,
    },
    Field {
        name: "readOnly",
        kind: FieldKind::Bool,
        non_empty: false,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing attribute: {field}")]
    Missing { field: &'static str },
    #[error("Field {field} should be type {expected}, received type {actual}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Field {field} must not be empty")]
    Empty { field: &'static str },
    #[error("Field {field} is out of range")]
    OutOfRange { field: &'static str },
    #[error("Request body must be a JSON object")]
    NotAnObject,
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),
    #[error("Malformed table fields: {0}")]
    Malformed(String),
}

/// The name of the JSON type of `value`, as reported in validation messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

impl Field {
    fn check(&self, value: &Value) -> Result<(), ValidationError> {
        if !self.kind.accepts(value) {
            return Err(ValidationError::WrongType {
                field: self.name,
                expected: self.kind.name(),
                actual: type_name(value),
            });
        }
        if self.kind == FieldKind::Int && !value.is_i64() {
            return Err(ValidationError::OutOfRange { field: self.name });
        }
        if self.non_empty && value.as_str().is_some_and(str::is_empty) {
            return Err(ValidationError::Empty { field: self.name });
        }
        Ok(())
    }
}

/// Parse a raw request body as JSON.
pub fn parse_body(bytes: &[u8]) -> Result<Value, ValidationError> {
    serde_json::from_slice(bytes).map_err(|e| ValidationError::InvalidJson(e.to_string()))
}

/// Check that `body` carries every schema field with the right type.
pub fn validate_all(body: &Value) -> Result<TableFields, ValidationError> {
    let accepted = validate(body, true)?;
    serde_json::from_value(Value::Object(accepted))
        .map_err(|e| ValidationError::Malformed(e.to_string()))
}

/// Check the schema fields that `body` carries, returning just those.
/// Keys that are not in the schema are dropped.
pub fn validate_present(body: &Value) -> Result<Map<String, Value>, ValidationError> {
    validate(body, false)
}

fn validate(body: &Value, require_all: bool) -> Result<Map<String, Value>, ValidationError> {
    let object = body.as_object().ok_or(ValidationError::NotAnObject)?;
    let mut accepted = Map::new();
    for field in FIELDS {
        let Some(value) = object.get(field.name) else {
            if require_all {
                return Err(ValidationError::Missing { field: field.name });
            }
            continue;
        };
        field.check(value)?;
        accepted.insert(field.name.to_string(), value.clone());
    }
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_all_accepts_complete_body() {
        let fields = validate_all(&json!({"name": "t1", "size": 10, "readOnly": false})).unwrap();
        assert_eq!(
            fields,
            TableFields {
                name: "t1".to_string(),
                size: 10,
                read_only: false,
            }
        );
    }

    #[test]
    fn test_validate_all_wrong_type_names_field() {
        let err = validate_all(&json!({"name": "t1", "size": "ten", "readOnly": false})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongType {
                field: "size",
                expected: "int",
                actual: "str",
            }
        );
        assert_eq!(
            err.to_string(),
            "Field size should be type int, received type str"
        );
    }

    #[test]
    fn test_validate_all_missing_field() {
        let err = validate_all(&json!({"name": "t1", "size": 10})).unwrap_err();
        assert_eq!(err, ValidationError::Missing { field: "readOnly" });
        assert_eq!(err.to_string(), "Missing attribute: readOnly");
    }

    #[test]
    fn test_validate_all_reports_first_field_in_schema_order() {
        let err = validate_all(&json!({"size": "x"})).unwrap_err();
        assert_eq!(err, ValidationError::Missing { field: "name" });
    }

    #[test]
    fn test_bool_is_not_int() {
        let err = validate_present(&json!({"size": true})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongType {
                field: "size",
                expected: "int",
                actual: "bool",
            }
        );
    }

    #[test]
    fn test_float_is_not_int() {
        let err = validate_present(&json!({"size": 1.5})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field size should be type int, received type float"
        );
    }

    #[test]
    fn test_int_out_of_range() {
        let err = validate_present(&json!({"size": u64::MAX})).unwrap_err();
        assert_eq!(err, ValidationError::OutOfRange { field: "size" });
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = validate_present(&json!({"name": ""})).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "name" });
    }

    #[test]
    fn test_validate_present_only_returns_schema_fields() {
        let accepted = validate_present(&json!({"size": 20, "id": "99", "color": "red"})).unwrap();
        assert_eq!(Value::Object(accepted), json!({"size": 20}));
    }

    #[test]
    fn test_validate_present_null_is_wrong_type() {
        let err = validate_present(&json!({"readOnly": null})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field readOnly should be type bool, received type null"
        );
    }

    #[test]
    fn test_not_an_object() {
        assert_eq!(
            validate_present(&json!([1, 2])).unwrap_err(),
            ValidationError::NotAnObject
        );
        assert_eq!(
            validate_all(&json!("table")).unwrap_err(),
            ValidationError::NotAnObject
        );
    }

    #[test]
    fn test_parse_body_invalid_json() {
        let err = parse_body(b"{\"name\": ").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidJson(_)));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(&json!(null)), "null");
        assert_eq!(type_name(&json!(1)), "int");
        assert_eq!(type_name(&json!(-1)), "int");
        assert_eq!(type_name(&json!(1.0)), "float");
        assert_eq!(type_name(&json!([])), "list");
        assert_eq!(type_name(&json!({})), "dict");
    }
}
