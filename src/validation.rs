//! Property bag validation
//!
//! Interprets a site's field schemas against a caller-supplied property
//! bag. Checks run in a fixed order and stop at the first violation:
//!
//! 1. every `required` schema field is present and non-empty for its type
//! 2. for each bag field with a schema entry, in bag order:
//!    type, then regex (text values only), then choices
//!
//! Bag fields without a schema entry are always accepted.

mod mask;

pub use mask::{mask_props, mask_with_schemas, REDACTED};

use crate::db::schema::{FieldType, SiteFieldSchema};
use crate::db::Store;
use crate::error::AppError;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Field name to dynamically typed value, in encounter order
pub type PropertyBag = serde_json::Map<String, Value>;

/// Why a property bag was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropsError {
    #[error("invalid props: field '{field}' required")]
    Missing { field: String },

    #[error("invalid props: field '{field}' type mismatch, expect {expected}")]
    TypeMismatch { field: String, expected: FieldType },

    #[error("invalid props: field '{field}' does not match regex")]
    RegexMismatch { field: String },

    #[error("invalid props: field '{field}' not in choices")]
    NotInChoices { field: String },

    /// The stored schema itself is broken; not the caller's fault
    #[error("invalid schema regex for field '{field}': {reason}")]
    InvalidRegex { field: String, reason: String },
}

impl PropsError {
    pub fn field(&self) -> &str {
        match self {
            PropsError::Missing { field }
            | PropsError::TypeMismatch { field, .. }
            | PropsError::RegexMismatch { field }
            | PropsError::NotInChoices { field }
            | PropsError::InvalidRegex { field, .. } => field,
        }
    }
}

impl From<PropsError> for AppError {
    fn from(err: PropsError) -> Self {
        match err {
            PropsError::InvalidRegex { .. } => AppError::SchemaDefinition(err.to_string()),
            _ => AppError::Validation(err.to_string()),
        }
    }
}

/// Validate `props` against the stored schemas of `site_key`
pub fn validate_props(store: &Store, site_key: &str, props: &PropertyBag) -> Result<(), AppError> {
    let schemas = store.site_schemas(site_key)?;
    validate_with_schemas(&schemas, props).map_err(|e| {
        debug!("Rejected props for {}.{}: {}", site_key, e.field(), e);
        AppError::from(e)
    })
}

/// Validate `props` against an already loaded schema set
pub fn validate_with_schemas(
    schemas: &[SiteFieldSchema],
    props: &PropertyBag,
) -> Result<(), PropsError> {
    for schema in schemas.iter().filter(|s| s.required) {
        let present = props
            .get(&schema.field)
            .is_some_and(|v| !is_empty_for_type(v, schema.field_type));
        if !present {
            return Err(PropsError::Missing {
                field: schema.field.clone(),
            });
        }
    }

    let by_field: HashMap<&str, &SiteFieldSchema> =
        schemas.iter().map(|s| (s.field.as_str(), s)).collect();

    for (field, value) in props {
        let Some(schema) = by_field.get(field.as_str()) else {
            continue;
        };

        if !type_matches(value, schema.field_type) {
            return Err(PropsError::TypeMismatch {
                field: field.clone(),
                expected: schema.field_type,
            });
        }
        check_regex(schema, value)?;
        check_choices(schema, value)?;
    }

    Ok(())
}

fn is_empty_for_type(value: &Value, field_type: FieldType) -> bool {
    match field_type {
        FieldType::String | FieldType::Datetime => match value {
            Value::String(s) => s.is_empty(),
            other => other.is_null(),
        },
        FieldType::Number | FieldType::Boolean | FieldType::Json => value.is_null(),
    }
}

fn type_matches(value: &Value, field_type: FieldType) -> bool {
    match field_type {
        FieldType::String => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Datetime => match value {
            Value::String(s) => {
                !s.is_empty() && chrono::DateTime::parse_from_rfc3339(s).is_ok()
            }
            _ => false,
        },
        FieldType::Json => value.is_array() || value.is_object(),
    }
}

fn check_regex(schema: &SiteFieldSchema, value: &Value) -> Result<(), PropsError> {
    if schema.regex.is_empty() {
        return Ok(());
    }
    let Value::String(text) = value else {
        return Ok(());
    };

    let re = Regex::new(&schema.regex).map_err(|e| PropsError::InvalidRegex {
        field: schema.field.clone(),
        reason: e.to_string(),
    })?;
    if re.is_match(text) {
        Ok(())
    } else {
        Err(PropsError::RegexMismatch {
            field: schema.field.clone(),
        })
    }
}

fn check_choices(schema: &SiteFieldSchema, value: &Value) -> Result<(), PropsError> {
    let Some(choices) = stored_choices(schema) else {
        return Ok(());
    };
    if choices.is_empty() || choices.iter().any(|c| same_value(value, c)) {
        Ok(())
    } else {
        Err(PropsError::NotInChoices {
            field: schema.field.clone(),
        })
    }
}

/// Decoded `choices`; a corrupt blob counts as no constraint
pub fn stored_choices(schema: &SiteFieldSchema) -> Option<Vec<Value>> {
    if schema.choices.is_empty() {
        return None;
    }
    match serde_json::from_str::<Vec<Value>>(&schema.choices) {
        Ok(choices) => Some(choices),
        Err(e) => {
            warn!(
                "Ignoring malformed choices for {}.{}: {}",
                schema.site_key, schema.field, e
            );
            None
        }
    }
}

/// Same primitive kind and same value; lists and maps never compare equal
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}
