//! Site route handlers
//!
//! CRUD for the sites whose accounts this server manages.

use crate::db::sites::Site;
use crate::error::{not_found_error, validation_error, ApiResult};
use crate::models::{CreateSiteRequest, MessageResponse, SuccessResponse, UpdateSiteRequest};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{debug, info};
use validator::Validate;

/// List all sites ordered by key
pub async fn list_sites(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<Site>>>> {
    let sites = state.store.list_sites()?;
    debug!("Listing {} sites", sites.len());

    Ok(Json(SuccessResponse::with_data(
        "Sites retrieved successfully.",
        sites,
    )))
}

/// Get one site
pub async fn get_site(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> ApiResult<Json<SuccessResponse<Site>>> {
    let site = state
        .store
        .get_site(&key)?
        .ok_or_else(|| not_found_error(format!("Site '{}' not found", key)))?;

    Ok(Json(SuccessResponse::with_data(
        "Site retrieved successfully.",
        site,
    )))
}

/// Create a new site
pub async fn create_site(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSiteRequest>,
) -> ApiResult<Json<SuccessResponse<Site>>> {
    let payload = payload.trimmed();
    payload
        .validate()
        .map_err(|e| validation_error(e.to_string()))?;

    debug!("Creating site: {}", payload.key);
    let site = state
        .store
        .create_site(&payload.key, &payload.name, &payload.login_url)?;

    info!("Site created: {} ({})", site.name, site.key);

    Ok(Json(SuccessResponse::with_data(
        "Site created successfully.",
        site,
    )))
}

/// Rename a site or change its login URL
pub async fn update_site(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(payload): Json<UpdateSiteRequest>,
) -> ApiResult<Json<SuccessResponse<Site>>> {
    let payload = payload.trimmed();
    payload
        .validate()
        .map_err(|e| validation_error(e.to_string()))?;

    let site = state
        .store
        .update_site(&key, &payload.name, &payload.login_url)?
        .ok_or_else(|| not_found_error(format!("Site '{}' not found", key)))?;

    info!("Site updated: {}", key);

    Ok(Json(SuccessResponse::with_data(
        "Site updated successfully.",
        site,
    )))
}

/// Delete a site row. Schemas and accounts stay behind.
pub async fn delete_site(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    if state.store.delete_site(&key)? {
        info!("Site deleted: {}", key);
    } else {
        debug!("Delete of unknown site {} ignored", key);
    }

    Ok(Json(MessageResponse::new("Site deleted successfully.")))
}
