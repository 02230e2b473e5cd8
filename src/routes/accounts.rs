//! Account route handlers
//!
//! Every props bag coming in is validated against the site's field
//! schemas; every props bag going out is masked.

use crate::db::accounts::{AccountRecord, AccountWrite};
use crate::db::ids::generate_id;
use crate::error::{not_found_error, validation_error, ApiResult, AppError};
use crate::models::{
    AccountListResponse, AccountRequest, AccountResponse, ActiveAccount, MessageResponse,
    SuccessResponse,
};
use crate::state::SharedState;
use crate::validation::{mask_props, mask_with_schemas, validate_props};
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{debug, info};
use validator::Validate;

/// Check the request and encode its props for storage
fn prepare(state: &SharedState, key: &str, payload: &AccountRequest) -> Result<String, AppError> {
    payload
        .validate()
        .map_err(|e| validation_error(e.to_string()))?;

    match &payload.props {
        Some(props) => {
            validate_props(&state.store, key, props)?;
            serde_json::to_string(props)
                .map_err(|e| AppError::Internal(format!("encode props: {}", e)))
        }
        None => Ok(String::new()),
    }
}

/// Response for a single account with secrets masked
fn masked(state: &SharedState, key: &str, record: AccountRecord) -> Result<AccountResponse, AppError> {
    let mut response = AccountResponse::from(record);
    if let Some(props) = &response.props {
        response.props = Some(mask_props(&state.store, key, props)?);
    }
    Ok(response)
}

/// Accounts of a site plus its active account id
pub async fn list_accounts(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> ApiResult<Json<SuccessResponse<AccountListResponse>>> {
    let schemas = state.store.site_schemas(&key)?;
    let accounts: Vec<AccountResponse> = state
        .store
        .list_accounts(&key)?
        .into_iter()
        .map(|record| {
            let mut response = AccountResponse::from(record);
            response.props = response.props.map(|p| mask_with_schemas(&schemas, &p));
            response
        })
        .collect();
    let active_id = state.store.active_account_id(&key)?;

    debug!("Site {} has {} account(s)", key, accounts.len());

    Ok(Json(SuccessResponse::with_data(
        "Accounts retrieved successfully.",
        AccountListResponse {
            accounts,
            active_id,
        },
    )))
}

/// One account of a site
pub async fn get_account(
    State(state): State<SharedState>,
    Path((key, id)): Path<(String, String)>,
) -> ApiResult<Json<SuccessResponse<AccountResponse>>> {
    let record = state
        .store
        .get_account(&key, &id)?
        .ok_or_else(|| not_found_error(format!("Account '{}' not found", id)))?;

    Ok(Json(SuccessResponse::with_data(
        "Account retrieved successfully.",
        masked(&state, &key, record)?,
    )))
}

/// Create an account after validating its props
pub async fn create_account(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(payload): Json<AccountRequest>,
) -> ApiResult<Json<SuccessResponse<AccountResponse>>> {
    let extra = prepare(&state, &key, &payload)?;
    let id = match payload.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate_id("acc"),
    };

    debug!("Creating account {} for site {}", id, key);
    let record = state.store.create_account(&AccountWrite {
        id: &id,
        site_key: &key,
        username: &payload.username,
        password: &payload.password,
        extra: &extra,
    })?;

    info!("Account created: {} ({})", record.username, record.id);

    Ok(Json(SuccessResponse::with_data(
        "Account created successfully.",
        masked(&state, &key, record)?,
    )))
}

/// Replace an account's username, password and props
pub async fn update_account(
    State(state): State<SharedState>,
    Path((key, id)): Path<(String, String)>,
    Json(payload): Json<AccountRequest>,
) -> ApiResult<Json<SuccessResponse<AccountResponse>>> {
    let extra = prepare(&state, &key, &payload)?;

    let record = state
        .store
        .update_account(&AccountWrite {
            id: &id,
            site_key: &key,
            username: &payload.username,
            password: &payload.password,
            extra: &extra,
        })?
        .ok_or_else(|| not_found_error(format!("Account '{}' not found", id)))?;

    info!("Account updated: {}", id);

    Ok(Json(SuccessResponse::with_data(
        "Account updated successfully.",
        masked(&state, &key, record)?,
    )))
}

/// Delete an account; unknown ids are not an error
pub async fn delete_account(
    State(state): State<SharedState>,
    Path((key, id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    if state.store.delete_account(&key, &id)? {
        info!("Account deleted: {}", id);
    }

    Ok(Json(MessageResponse::new("Account deleted successfully.")))
}

pub async fn get_active_account(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> ApiResult<Json<SuccessResponse<ActiveAccount>>> {
    let account_id = state.store.active_account_id(&key)?;

    Ok(Json(SuccessResponse::with_data(
        "Active account retrieved successfully.",
        ActiveAccount { account_id },
    )))
}

/// Point the site at an account, or clear the pointer with `null`
pub async fn set_active_account(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(payload): Json<ActiveAccount>,
) -> ApiResult<Json<SuccessResponse<ActiveAccount>>> {
    state
        .store
        .set_active_account_id(&key, payload.account_id.as_deref())?;
    info!("Active account of {} set to {:?}", key, payload.account_id);

    Ok(Json(SuccessResponse::with_data(
        "Active account updated successfully.",
        payload,
    )))
}

#[cfg(test)]
mod tests {
    use crate::routes::tests::{send, test_app};
    use axum::http::StatusCode;
    use axum::Router;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn with_schema() -> Router {
        let app = test_app();
        let (status, _) = send(
            &app,
            "POST",
            "/api/sites/gh/schema",
            Some(json!({"fields": [
                {"field": "email", "type": "string", "required": true, "regex": "^[^@]+@[^@]+$"},
                {"field": "token", "type": "string", "secret": true},
                {"field": "tier", "type": "string", "choices": ["gold", "silver"]}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        app
    }

    #[tokio::test]
    async fn test_create_masks_secrets_and_keeps_unknown_fields() {
        let app = with_schema().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/sites/gh/accounts",
            Some(json!({
                "username": "amy",
                "password": "hunter2",
                "props": {"email": "amy@example.com", "token": "s3cr3t", "nickname": "A"}
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let account = &body["data"];
        assert!(account["id"].as_str().unwrap().starts_with("acc_"));
        assert_eq!(account["hasPassword"], json!(true));
        assert!(account.get("password").is_none());
        assert_eq!(
            account["props"],
            json!({"email": "amy@example.com", "token": "***", "nickname": "A"})
        );
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_props() {
        let app = with_schema().await;
        let cases = [
            (json!({"token": "x"}), "email"),
            (json!({"email": "not-an-email"}), "email"),
            (json!({"email": "a@b.c", "tier": "bronze"}), "tier"),
            (json!({"email": 5}), "email"),
        ];

        for (props, field) in cases {
            let (status, body) = send(
                &app,
                "POST",
                "/api/sites/gh/accounts",
                Some(json!({"username": "amy", "props": props})),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {}", props);
            assert!(body["message"].as_str().unwrap().contains(field));
        }

        let (_, body) = send(&app, "GET", "/api/sites/gh/accounts", None).await;
        assert_eq!(body["data"]["accounts"], json!([]));
    }

    #[tokio::test]
    async fn test_list_masks_and_reports_active() {
        let app = with_schema().await;
        send(
            &app,
            "POST",
            "/api/sites/gh/accounts",
            Some(json!({"id": "acc_1", "username": "amy", "props": {"email": "a@b.c", "token": "t"}})),
        )
        .await;
        send(
            &app,
            "PUT",
            "/api/sites/gh/active-account",
            Some(json!({"accountId": "acc_1"})),
        )
        .await;

        let (status, body) = send(&app, "GET", "/api/sites/gh/accounts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["activeId"], json!("acc_1"));
        assert_eq!(body["data"]["accounts"][0]["props"]["token"], json!("***"));
        assert_eq!(body["data"]["accounts"][0]["hasPassword"], json!(false));

        let (_, body) = send(&app, "GET", "/api/sites/gh/accounts/acc_1", None).await;
        assert_eq!(body["data"]["props"]["token"], json!("***"));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = test_app();
        let (status, _) = send(
            &app,
            "PUT",
            "/api/sites/gh/accounts/missing",
            Some(json!({"username": "amy"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(
            &app,
            "POST",
            "/api/sites/gh/accounts",
            Some(json!({"id": "acc_1", "username": "amy"})),
        )
        .await;
        let (status, body) = send(
            &app,
            "PUT",
            "/api/sites/gh/accounts/acc_1",
            Some(json!({"username": "bob", "password": "pw", "props": {"k": 1}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], json!("bob"));
        assert_eq!(body["data"]["props"], json!({"k": 1}));

        let (status, _) = send(&app, "DELETE", "/api/sites/gh/accounts/acc_1", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "GET", "/api/sites/gh/accounts/acc_1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_account_id_is_conflict() {
        let app = test_app();
        let account = json!({"id": "acc_1", "username": "amy"});
        send(&app, "POST", "/api/sites/gh/accounts", Some(account.clone())).await;

        let (status, _) = send(&app, "POST", "/api/sites/gh/accounts", Some(account)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_active_account_can_be_cleared() {
        let app = test_app();
        let (_, body) = send(&app, "GET", "/api/sites/gh/active-account", None).await;
        assert_eq!(body["data"]["accountId"], json!(null));

        send(
            &app,
            "PUT",
            "/api/sites/gh/active-account",
            Some(json!({"accountId": "acc_9"})),
        )
        .await;
        let (_, body) = send(&app, "GET", "/api/sites/gh/active-account", None).await;
        assert_eq!(body["data"]["accountId"], json!("acc_9"));

        send(
            &app,
            "PUT",
            "/api/sites/gh/active-account",
            Some(json!({"accountId": null})),
        )
        .await;
        let (_, body) = send(&app, "GET", "/api/sites/gh/active-account", None).await;
        assert_eq!(body["data"]["accountId"], json!(null));
    }
}
