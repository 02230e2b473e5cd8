//! Site field schema persistence
//!
//! Pure data access for per-site field definitions. No value-shape
//! validation happens here.

use super::queries::{DELETE_SITE_SCHEMA, SELECT_SITE_SCHEMAS, UPSERT_SITE_SCHEMA};
use super::Store;
use crate::error::AppError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Declared type of a site field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Datetime,
    Json,
}

impl FieldType {
    pub const ALL: [FieldType; 5] = [
        FieldType::String,
        FieldType::Number,
        FieldType::Boolean,
        FieldType::Datetime,
        FieldType::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Datetime => "datetime",
            FieldType::Json => "json",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown field type '{0}'")]
pub struct UnknownFieldType(pub String);

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownFieldType(s.to_string()))
    }
}

impl ToSql for FieldType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for FieldType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// One field definition owned by a site, keyed by `(site_key, field)`
#[derive(Debug, Clone, PartialEq)]
pub struct SiteFieldSchema {
    pub site_key: String,
    pub field: String,
    pub field_type: FieldType,
    pub required: bool,
    /// Encoded JSON, empty when unset
    pub default_value: String,
    /// Only meaningful for text values; empty means no constraint
    pub regex: String,
    /// Encoded JSON array, empty when unset
    pub choices: String,
    pub secret: bool,
    pub order: i64,
    pub ui_hint: String,
}

impl SiteFieldSchema {
    pub fn new(site_key: impl Into<String>, field: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            site_key: site_key.into(),
            field: field.into(),
            field_type,
            required: false,
            default_value: String::new(),
            regex: String::new(),
            choices: String::new(),
            secret: false,
            order: 0,
            ui_hint: String::new(),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            site_key: row.get(0)?,
            field: row.get(1)?,
            field_type: row.get(2)?,
            required: row.get(3)?,
            default_value: row.get(4)?,
            regex: row.get(5)?,
            choices: row.get(6)?,
            secret: row.get(7)?,
            order: row.get(8)?,
            ui_hint: row.get(9)?,
        })
    }
}

fn upsert(conn: &Connection, s: &SiteFieldSchema) -> rusqlite::Result<usize> {
    conn.execute(
        UPSERT_SITE_SCHEMA,
        params![
            s.site_key,
            s.field,
            s.field_type,
            s.required,
            s.default_value,
            s.regex,
            s.choices,
            s.secret,
            s.order,
            s.ui_hint,
        ],
    )
}

impl Store {
    /// All field schemas of a site, ordered by `order` then `field`
    pub fn site_schemas(&self, site_key: &str) -> Result<Vec<SiteFieldSchema>, AppError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(SELECT_SITE_SCHEMAS)?;
        let rows = stmt.query_map([site_key], SiteFieldSchema::from_row)?;
        let schemas = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| match e {
                rusqlite::Error::FromSqlConversionFailure(_, _, source) => AppError::SchemaDefinition(
                    format!("site '{}': {}", site_key, source),
                ),
                other => AppError::Database(other),
            })?;
        Ok(schemas)
    }

    /// Insert, or replace every non-key attribute on `(site_key, field)` conflict
    pub fn upsert_site_schema(&self, schema: &SiteFieldSchema) -> Result<(), AppError> {
        let conn = self.connection()?;
        upsert(&conn, schema)?;
        debug!("Upserted schema {}.{}", schema.site_key, schema.field);
        Ok(())
    }

    /// Upsert several fields atomically
    pub fn upsert_site_schemas(&self, schemas: &[SiteFieldSchema]) -> Result<(), AppError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        for schema in schemas {
            upsert(&tx, schema)?;
        }
        tx.commit()?;
        debug!("Upserted {} schema field(s)", schemas.len());
        Ok(())
    }

    /// Remove one field definition; returns whether a row existed
    pub fn delete_site_schema(&self, site_key: &str, field: &str) -> Result<bool, AppError> {
        let conn = self.connection()?;
        let removed = conn.execute(DELETE_SITE_SCHEMA, params![site_key, field])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::migrated_store;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_type_round_trips_through_str() {
        for t in FieldType::ALL {
            assert_eq!(t.as_str().parse::<FieldType>().unwrap(), t);
        }
        assert!("integer".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_schemas_ordered_by_order_then_field() {
        let store = migrated_store();
        let mut b = SiteFieldSchema::new("s", "b", FieldType::String);
        b.order = 1;
        let mut a = SiteFieldSchema::new("s", "a", FieldType::String);
        a.order = 1;
        let mut z = SiteFieldSchema::new("s", "z", FieldType::Number);
        z.order = 0;
        store.upsert_site_schemas(&[b, a, z]).unwrap();
        store
            .upsert_site_schema(&SiteFieldSchema::new("other", "x", FieldType::Json))
            .unwrap();

        let fields: Vec<String> = store
            .site_schemas("s")
            .unwrap()
            .into_iter()
            .map(|s| s.field)
            .collect();
        assert_eq!(fields, vec!["z", "a", "b"]);
    }

    #[test]
    fn test_upsert_replaces_non_key_attributes() {
        let store = migrated_store();
        let mut s = SiteFieldSchema::new("s", "code", FieldType::String);
        s.regex = "^[A-Z]{3}$".into();
        s.secret = true;
        store.upsert_site_schema(&s).unwrap();

        let mut replacement = SiteFieldSchema::new("s", "code", FieldType::Number);
        replacement.required = true;
        replacement.choices = "[1,2]".into();
        replacement.ui_hint = "select".into();
        store.upsert_site_schema(&replacement).unwrap();

        let stored = store.site_schemas("s").unwrap();
        assert_eq!(stored, vec![replacement]);
    }

    #[test]
    fn test_delete_site_schema() {
        let store = migrated_store();
        store
            .upsert_site_schema(&SiteFieldSchema::new("s", "f", FieldType::Boolean))
            .unwrap();

        assert!(store.delete_site_schema("s", "f").unwrap());
        assert!(!store.delete_site_schema("s", "f").unwrap());
        assert!(store.site_schemas("s").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_stored_type_is_schema_definition_error() {
        let store = migrated_store();
        store
            .connection()
            .unwrap()
            .execute(
                "INSERT INTO site_field_schemas (site_key, field, type) VALUES ('s', 'f', 'blob')",
                [],
            )
            .unwrap();

        let err = store.site_schemas("s").unwrap_err();
        assert!(matches!(err, AppError::SchemaDefinition(_)));
    }

    #[test]
    fn test_schemas_require_migrations() {
        let store = Store::in_memory().unwrap();
        assert!(matches!(
            store.site_schemas("s"),
            Err(AppError::Database(_))
        ));
    }
}
