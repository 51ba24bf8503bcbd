//! Organization provisioning endpoint.

use axum::{extract::State, Json};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateOrganizationRequest, CreatedOrganization};
use crate::AppState;

/// POST /api/organizations - Create an organization and issue its API key.
pub async fn create_organization(
    State(state): State<AppState>,
    Json(request): Json<CreateOrganizationRequest>,
) -> ApiResult<CreatedOrganization> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let organization = state.repo.create_organization(&request).await?;
    tracing::info!(organization_id = %organization.id, "Organization created");

    let api_key = organization.api_key.clone();
    success(CreatedOrganization {
        organization,
        api_key,
    })
}
