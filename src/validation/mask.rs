//! Secret masking for outbound property bags

use super::PropertyBag;
use crate::db::schema::SiteFieldSchema;
use crate::db::Store;
use crate::error::AppError;
use serde_json::Value;

/// Replacement for every secret value leaving the system
pub const REDACTED: &str = "***";

/// Masked copy of `props` using the stored schemas of `site_key`
pub fn mask_props(store: &Store, site_key: &str, props: &PropertyBag) -> Result<PropertyBag, AppError> {
    let schemas = store.site_schemas(site_key)?;
    Ok(mask_with_schemas(&schemas, props))
}

/// Shallow copy of `props` with secret fields redacted
pub fn mask_with_schemas(schemas: &[SiteFieldSchema], props: &PropertyBag) -> PropertyBag {
    let mut masked = props.clone();
    for schema in schemas.iter().filter(|s| s.secret) {
        if let Some(value) = masked.get_mut(&schema.field) {
            *value = Value::String(REDACTED.to_string());
        }
    }
    masked
}
