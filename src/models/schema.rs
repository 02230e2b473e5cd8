//! Field schema DTOs

use crate::db::schema::{FieldType, SiteFieldSchema};
use crate::error::{validation_error, AppError};
use crate::validation::stored_choices;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// One field definition as sent by clients
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SchemaFieldRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Field name is required"))]
    pub field: String,

    #[serde(rename = "type", default)]
    #[validate(length(min = 1, message = "Field type is required"))]
    pub field_type: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default)]
    pub regex: String,

    /// JSON array of allowed values
    #[serde(default)]
    pub choices: Option<Value>,

    #[serde(default)]
    pub secret: bool,

    #[serde(default)]
    pub order: i64,

    #[serde(default)]
    pub ui_hint: String,
}

/// Body of `POST /sites/{key}/schema`
#[derive(Debug, Deserialize)]
pub struct UpsertSchemaRequest {
    pub fields: Vec<SchemaFieldRequest>,
}

impl SchemaFieldRequest {
    /// Check the definition and turn it into a storable row
    pub fn into_schema(self, site_key: &str) -> Result<SiteFieldSchema, AppError> {
        self.validate()
            .map_err(|e| validation_error(e.to_string()))?;

        let field_type: FieldType = self
            .field_type
            .parse()
            .map_err(|e| validation_error(format!("field '{}': {}", self.field, e)))?;

        if !self.regex.is_empty() {
            Regex::new(&self.regex).map_err(|e| {
                validation_error(format!("field '{}': invalid regex: {}", self.field, e))
            })?;
        }

        let choices = match self.choices {
            None | Some(Value::Null) => String::new(),
            Some(v @ Value::Array(_)) => encode(&v)?,
            Some(_) => {
                return Err(validation_error(format!(
                    "field '{}': choices must be an array",
                    self.field
                )))
            }
        };

        let default_value = match self.default {
            None | Some(Value::Null) => String::new(),
            Some(v) => encode(&v)?,
        };

        Ok(SiteFieldSchema {
            site_key: site_key.to_string(),
            field: self.field,
            field_type,
            required: self.required,
            default_value,
            regex: self.regex,
            choices,
            secret: self.secret,
            order: self.order,
            ui_hint: self.ui_hint,
        })
    }
}

fn encode(value: &Value) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(format!("encode json: {}", e)))
}

/// One field definition as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaFieldResponse {
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub default: Value,
    pub regex: String,
    pub choices: Value,
    pub secret: bool,
    pub order: i64,
    pub ui_hint: String,
}

impl From<SiteFieldSchema> for SchemaFieldResponse {
    fn from(s: SiteFieldSchema) -> Self {
        let default = if s.default_value.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&s.default_value).unwrap_or(Value::Null)
        };
        let choices = stored_choices(&s).map(Value::Array).unwrap_or(Value::Null);

        Self {
            field: s.field,
            field_type: s.field_type,
            required: s.required,
            default,
            regex: s.regex,
            choices,
            secret: s.secret,
            order: s.order,
            ui_hint: s.ui_hint,
        }
    }
}
