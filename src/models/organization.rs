//! Organization model.

use serde::{Deserialize, Serialize};

/// A tenant owning forms. The API key is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(skip)]
    pub api_key: String,
    pub created_at: String,
}

/// Request body for creating an organization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationRequest {
    pub name: String,
}

/// Returned once on creation; the only time the API key is shown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrganization {
    #[serde(flatten)]
    pub organization: Organization,
    pub api_key: String,
}
