//! Site DTOs

use serde::Deserialize;
use validator::Validate;

/// Request to create a new site
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSiteRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 64, message = "Site key must be between 1 and 64 characters"))]
    pub key: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Site name is required"))]
    pub name: String,

    #[serde(default)]
    pub login_url: String,
}

impl CreateSiteRequest {
    pub fn trimmed(mut self) -> Self {
        self.key = self.key.trim().to_string();
        self.name = self.name.trim().to_string();
        self
    }
}

/// Request to update an existing site
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSiteRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Site name is required"))]
    pub name: String,

    #[serde(default)]
    pub login_url: String,
}

impl UpdateSiteRequest {
    pub fn trimmed(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }
}
