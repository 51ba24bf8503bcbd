//! Form management endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{success, ApiResult};
use crate::auth::CurrentOrganization;
use crate::errors::AppError;
use crate::form::{extract_fields, flatten, paginate, Document, ExtractedField};
use crate::models::{CreateFormRequest, Form, FormPage, FormSummary, UpdateFormRequest};
use crate::AppState;

/// GET /api/forms - List the organization's forms.
pub async fn list_forms(
    State(state): State<AppState>,
    Extension(CurrentOrganization(org)): Extension<CurrentOrganization>,
) -> ApiResult<Vec<FormSummary>> {
    success(state.repo.list_forms(&org.id).await?)
}

/// POST /api/forms - Create a form.
pub async fn create_form(
    State(state): State<AppState>,
    Extension(CurrentOrganization(org)): Extension<CurrentOrganization>,
    Json(request): Json<CreateFormRequest>,
) -> ApiResult<Form> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let (document, assigned) = match request.content {
        Some(content) => Document::parse_draft(content)?,
        None => (Document::new(Vec::new()), 0),
    };

    let form = state
        .repo
        .create_form(
            &org.id,
            &request.name,
            &document,
            request.published.unwrap_or(false),
        )
        .await?;
    tracing::info!(form_id = %form.id, assigned, "Form created");

    success(form)
}

/// GET /api/forms/:id - Get a single form.
pub async fn get_form(
    State(state): State<AppState>,
    Extension(CurrentOrganization(org)): Extension<CurrentOrganization>,
    Path(id): Path<String>,
) -> ApiResult<Form> {
    success(owned_form(&state, &org.id, &id).await?)
}

/// PUT /api/forms/:id - Update a form's name, content or published flag.
pub async fn update_form(
    State(state): State<AppState>,
    Extension(CurrentOrganization(org)): Extension<CurrentOrganization>,
    Path(id): Path<String>,
    Json(request): Json<UpdateFormRequest>,
) -> ApiResult<Form> {
    if matches!(&request.name, Some(name) if name.trim().is_empty()) {
        return Err(AppError::Validation("Name cannot be empty".to_string()));
    }

    let document = match &request.content {
        Some(content) => {
            let (document, assigned) = Document::parse_draft(content.clone())?;
            if assigned > 0 {
                tracing::debug!(form_id = %id, assigned, "Assigned new question ids");
            }
            Some(document)
        }
        None => None,
    };

    success(
        state
            .repo
            .update_form(&org.id, &id, &request, document.as_ref())
            .await?,
    )
}

/// DELETE /api/forms/:id - Delete a form and its responses.
pub async fn delete_form(
    State(state): State<AppState>,
    Extension(CurrentOrganization(org)): Extension<CurrentOrganization>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_form(&org.id, &id).await?;
    tracing::info!(form_id = %id, "Form deleted");
    success(())
}

/// GET /api/forms/:id/fields - Answerable fields in document order.
pub async fn get_form_fields(
    State(state): State<AppState>,
    Extension(CurrentOrganization(org)): Extension<CurrentOrganization>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ExtractedField>> {
    let form = owned_form(&state, &org.id, &id).await?;

    success(extract_fields(&flatten(form.content.root())))
}

/// GET /api/forms/:id/pages - The document split at page breaks.
pub async fn get_form_pages(
    State(state): State<AppState>,
    Extension(CurrentOrganization(org)): Extension<CurrentOrganization>,
    Path(id): Path<String>,
) -> ApiResult<Vec<FormPage>> {
    let form = owned_form(&state, &org.id, &id).await?;

    success(
        paginate(form.content.root())
            .into_iter()
            .map(FormPage::from)
            .collect(),
    )
}

/// Load a form owned by the organization, or 404.
pub(super) async fn owned_form(
    state: &AppState,
    organization_id: &str,
    id: &str,
) -> Result<Form, AppError> {
    state
        .repo
        .get_form(organization_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Form {} not found", id)))
}
