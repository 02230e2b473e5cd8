//! Field schema route handlers

use crate::error::{ApiResult, AppError};
use crate::models::{
    MessageResponse, SchemaFieldRequest, SchemaFieldResponse, SuccessResponse,
    UpsertSchemaRequest,
};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{debug, info};

/// Current schema list of a site, converted for the wire
fn schema_list(state: &SharedState, key: &str) -> Result<Vec<SchemaFieldResponse>, AppError> {
    Ok(state
        .store
        .site_schemas(key)?
        .into_iter()
        .map(SchemaFieldResponse::from)
        .collect())
}

/// Ordered field schemas of a site
pub async fn get_schema(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> ApiResult<Json<SuccessResponse<Vec<SchemaFieldResponse>>>> {
    let fields = schema_list(&state, &key)?;
    debug!("Site {} has {} schema field(s)", key, fields.len());

    Ok(Json(SuccessResponse::with_data(
        "Schema retrieved successfully.",
        fields,
    )))
}

/// Upsert a batch of field definitions in one transaction
pub async fn post_schema(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(payload): Json<UpsertSchemaRequest>,
) -> ApiResult<Json<SuccessResponse<Vec<SchemaFieldResponse>>>> {
    let schemas = payload
        .fields
        .into_iter()
        .map(|f| f.into_schema(&key))
        .collect::<Result<Vec<_>, _>>()?;

    state.store.upsert_site_schemas(&schemas)?;
    info!("Upserted {} schema field(s) for site {}", schemas.len(), key);

    Ok(Json(SuccessResponse::with_data(
        "Schema saved successfully.",
        schema_list(&state, &key)?,
    )))
}

/// Upsert a single field definition addressed by path
pub async fn put_schema(
    State(state): State<SharedState>,
    Path((key, field)): Path<(String, String)>,
    Json(mut payload): Json<SchemaFieldRequest>,
) -> ApiResult<Json<SuccessResponse<Vec<SchemaFieldResponse>>>> {
    if payload.field.is_empty() {
        payload.field = field.clone();
    } else if payload.field != field {
        return Err(AppError::BadRequest(format!(
            "Field name '{}' does not match path field '{}'",
            payload.field, field
        )));
    }

    let schema = payload.into_schema(&key)?;
    state.store.upsert_site_schema(&schema)?;
    info!("Schema field {}.{} saved", key, field);

    Ok(Json(SuccessResponse::with_data(
        "Schema field saved successfully.",
        schema_list(&state, &key)?,
    )))
}

/// Remove one field definition
pub async fn delete_schema(
    State(state): State<SharedState>,
    Path((key, field)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    if state.store.delete_site_schema(&key, &field)? {
        info!("Schema field {}.{} deleted", key, field);
    }

    Ok(Json(MessageResponse::new("Schema field deleted successfully.")))
}
