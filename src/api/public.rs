//! Public share-link endpoints: loading a published form and submitting to it.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::form::{paginate, verify_value};
use crate::models::{
    Form, FormPage, PublicForm, ResponseMetadata, SenderInfo, StoredResponse,
    SubmitResponseRequest,
};
use crate::AppState;

/// Header carrying the id of a signed-in respondent, set by the session layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// GET /f/:id - A published form, split into pages.
pub async fn get_public_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PublicForm> {
    let form = published_form(&state, &id).await?;
    let pages = paginate(form.content.root())
        .into_iter()
        .map(FormPage::from)
        .collect();

    success(PublicForm {
        id: form.id,
        name: form.name,
        pages,
    })
}

/// POST /f/:id/responses - Verify a submission against the current form and
/// store it.
pub async fn submit_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<SubmitResponseRequest>,
) -> ApiResult<StoredResponse> {
    let form = published_form(&state, &id).await?;

    let answers = verify_value(request.answers, &form.content)?;

    let metadata = ResponseMetadata {
        user_id: header_value(&headers, USER_ID_HEADER),
        sender: sender_info(&headers),
    };
    let response = state
        .repo
        .create_response(&form.id, &answers, &metadata)
        .await?;
    tracing::info!(form_id = %form.id, response_id = %response.id, "Response stored");

    success(response)
}

async fn published_form(state: &AppState, id: &str) -> Result<Form, AppError> {
    state
        .repo
        .get_published_form(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Form {} not found", id)))
}

/// Client address as reported by the proxy in front of the service.
fn sender_info(headers: &HeaderMap) -> SenderInfo {
    let ip = header_value(headers, "x-forwarded-for")
        .and_then(|list| list.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_value(headers, "x-real-ip"));

    SenderInfo {
        ip,
        user_agent: header_value(headers, header::USER_AGENT.as_str()),
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_sender_info_prefers_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));

        let sender = sender_info(&headers);
        assert_eq!(sender.ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(sender.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_sender_info_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));

        let sender = sender_info(&headers);
        assert_eq!(sender.ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(sender.user_agent, None);
    }
}
