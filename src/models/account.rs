//! Account DTOs

use crate::db::accounts::AccountRecord;
use crate::validation::PropertyBag;
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

/// Request body for account create/update
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub props: Option<PropertyBag>,
}

/// Account as returned to clients; the password never leaves the server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub site_key: String,
    pub username: String,
    pub has_password: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<PropertyBag>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<AccountRecord> for AccountResponse {
    fn from(a: AccountRecord) -> Self {
        let props = decode_props(&a);
        Self {
            has_password: !a.password.is_empty(),
            id: a.id,
            site_key: a.site_key,
            username: a.username,
            props,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// Stored props; an undecodable blob is treated as absent
fn decode_props(a: &AccountRecord) -> Option<PropertyBag> {
    if a.extra.is_empty() {
        return None;
    }
    match serde_json::from_str(&a.extra) {
        Ok(props) => Some(props),
        Err(e) => {
            warn!("Account {} has undecodable props: {}", a.id, e);
            None
        }
    }
}

/// Accounts of one site plus its active pointer
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountListResponse {
    pub accounts: Vec<AccountResponse>,
    pub active_id: Option<String>,
}

/// Body and response of the active-account endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAccount {
    #[serde(default)]
    pub account_id: Option<String>,
}
