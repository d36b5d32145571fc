//! Schema interpretation: validating raw request data into typed values.
//!
//! The binder walks the schema in declaration order and fails fast: the
//! first field that cannot be bound is the one reported. Paths in errors
//! are dotted (`profile.age`) with array indexes in brackets (`tags[2]`).

use std::collections::BTreeMap;

use serde_json::Value as Json;

use crate::errors::ValidationError;
use crate::schema::{Field, FieldKind, Schema};
use crate::source::{Raw, RawSource};
use crate::value::{BoundParams, Value};

/// Bind a schema against raw request data.
pub(crate) fn bind(schema: &Schema, source: &RawSource) -> Result<BoundParams, ValidationError> {
    let mut params = BoundParams::empty();
    for field in schema.fields() {
        let raw = source.lookup(&field.name);
        let value = bind_field(&field.name, field, raw)?;
        params.insert(field.name.clone(), value);
    }
    Ok(params)
}

/// Bind a single field at `path` from its looked-up raw value, if any.
fn bind_field(path: &str, field: &Field, raw: Option<Raw<'_>>) -> Result<Value, ValidationError> {
    // JSON null counts as absent.
    let raw = raw.filter(|r| !matches!(r, Raw::Json(Json::Null)));

    let Some(raw) = raw else {
        if field.nullable {
            return Ok(Value::Null);
        }
        return Err(ValidationError::MissingField { path: path.into() });
    };

    // A nilable object binds to null only when every immediate key the
    // sub-schema names is absent; any partial presence validates the
    // whole subtree.
    if field.nullable {
        if let FieldKind::Object(sub) = &field.kind {
            if let Raw::Json(Json::Object(map)) = raw {
                let all_absent = sub
                    .fields()
                    .iter()
                    .all(|f| matches!(map.get(&f.name), None | Some(Json::Null)));
                if all_absent {
                    return Ok(Value::Null);
                }
            }
        }
    }

    convert(path, &field.kind, raw)
}

fn convert(path: &str, kind: &FieldKind, raw: Raw<'_>) -> Result<Value, ValidationError> {
    match raw {
        Raw::Str(s) => convert_str(path, kind, s),
        Raw::Json(json) => convert_json(path, kind, json),
    }
}

/// Convert a flat string from route or query parameters.
fn convert_str(path: &str, kind: &FieldKind, s: &str) -> Result<Value, ValidationError> {
    match kind {
        FieldKind::String => Ok(Value::String(s.to_owned())),
        FieldKind::Integer => s
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| mismatch(path, "integer", s)),
        FieldKind::Float => s
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| mismatch(path, "float", s)),
        FieldKind::Boolean => parse_bool(s).ok_or_else(|| mismatch(path, "boolean", s)),
        // Objects and arrays only bind from the body; a flat string can
        // never satisfy them.
        FieldKind::Object(_) | FieldKind::Array(_) => Err(mismatch(path, kind.name(), s)),
    }
}

/// Convert a JSON value from the request body.
fn convert_json(path: &str, kind: &FieldKind, json: &Json) -> Result<Value, ValidationError> {
    match kind {
        FieldKind::String => json
            .as_str()
            .map(|s| Value::String(s.to_owned()))
            .ok_or_else(|| mismatch(path, "string", &display(json))),
        FieldKind::Integer => {
            if let Some(n) = json.as_i64() {
                Ok(Value::Integer(n))
            } else if let Some(s) = json.as_str() {
                s.parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|_| mismatch(path, "integer", s))
            } else {
                Err(mismatch(path, "integer", &display(json)))
            }
        }
        FieldKind::Float => {
            if let Some(f) = json.as_f64() {
                Ok(Value::Float(f))
            } else if let Some(s) = json.as_str() {
                s.parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| mismatch(path, "float", s))
            } else {
                Err(mismatch(path, "float", &display(json)))
            }
        }
        FieldKind::Boolean => {
            if let Some(b) = json.as_bool() {
                Ok(Value::Boolean(b))
            } else if let Some(s) = json.as_str() {
                parse_bool(s).ok_or_else(|| mismatch(path, "boolean", s))
            } else {
                Err(mismatch(path, "boolean", &display(json)))
            }
        }
        FieldKind::Object(sub) => match json.as_object() {
            Some(map) => bind_object(path, sub, map),
            None => Err(mismatch(path, "object", &display(json))),
        },
        FieldKind::Array(elem) => match json.as_array() {
            Some(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let elem_path = format!("{path}[{index}]");
                    out.push(convert(&elem_path, elem, Raw::Json(item))?);
                }
                Ok(Value::Array(out))
            }
            None => Err(mismatch(path, "array", &display(json))),
        },
    }
}

/// Validate a nested object subtree, extending the dotted path.
fn bind_object(
    path: &str,
    schema: &Schema,
    map: &serde_json::Map<String, Json>,
) -> Result<Value, ValidationError> {
    let mut values = BTreeMap::new();
    for field in schema.fields() {
        let field_path = format!("{path}.{}", field.name);
        let raw = map.get(&field.name).map(Raw::Json);
        let value = bind_field(&field_path, field, raw)?;
        let _ = values.insert(field.name.clone(), value);
    }
    Ok(Value::Object(values))
}

/// Canonical boolean literals.
fn parse_bool(s: &str) -> Option<Value> {
    match s {
        "true" => Some(Value::Boolean(true)),
        "false" => Some(Value::Boolean(false)),
        _ => None,
    }
}

fn mismatch(path: &str, expected: &'static str, found: &str) -> ValidationError {
    ValidationError::TypeMismatch {
        path: path.into(),
        expected,
        found: found.to_owned(),
    }
}

/// Display form of a raw JSON value for error messages: strings render
/// bare, everything else as compact JSON.
fn display(json: &Json) -> String {
    match json {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}
