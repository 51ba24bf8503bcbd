//! Response browsing endpoints for form owners.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::forms::owned_form;
use super::{success, ApiResult};
use crate::auth::CurrentOrganization;
use crate::errors::AppError;
use crate::models::{BulkDeleteRequest, BulkDeleteResult, StoredResponse};
use crate::AppState;

/// GET /api/forms/:id/responses - List a form's responses.
pub async fn list_responses(
    State(state): State<AppState>,
    Extension(CurrentOrganization(org)): Extension<CurrentOrganization>,
    Path(form_id): Path<String>,
) -> ApiResult<Vec<StoredResponse>> {
    let form = owned_form(&state, &org.id, &form_id).await?;
    success(state.repo.list_responses(&form.id).await?)
}

/// GET /api/forms/:id/responses/:response_id - Get a single response.
pub async fn get_response(
    State(state): State<AppState>,
    Extension(CurrentOrganization(org)): Extension<CurrentOrganization>,
    Path((form_id, response_id)): Path<(String, String)>,
) -> ApiResult<StoredResponse> {
    let form = owned_form(&state, &org.id, &form_id).await?;

    match state.repo.get_response(&form.id, &response_id).await? {
        Some(response) => success(response),
        None => Err(AppError::NotFound(format!(
            "Response {} not found",
            response_id
        ))),
    }
}

/// DELETE /api/forms/:id/responses/:response_id - Delete a single response.
pub async fn delete_response(
    State(state): State<AppState>,
    Extension(CurrentOrganization(org)): Extension<CurrentOrganization>,
    Path((form_id, response_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let form = owned_form(&state, &org.id, &form_id).await?;
    state.repo.delete_response(&form.id, &response_id).await?;
    success(())
}

/// POST /api/forms/:id/responses/delete - Delete several responses.
pub async fn bulk_delete_responses(
    State(state): State<AppState>,
    Extension(CurrentOrganization(org)): Extension<CurrentOrganization>,
    Path(form_id): Path<String>,
    Json(request): Json<BulkDeleteRequest>,
) -> ApiResult<BulkDeleteResult> {
    if request.ids.is_empty() {
        return Err(AppError::Validation("No response ids provided".to_string()));
    }

    let form = owned_form(&state, &org.id, &form_id).await?;
    let deleted = state.repo.delete_responses(&form.id, &request.ids).await?;
    let remaining = state.repo.count_responses(&form.id).await?;
    tracing::info!(form_id = %form.id, deleted, remaining, "Responses deleted");

    success(BulkDeleteResult { deleted, remaining })
}
