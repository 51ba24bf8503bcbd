//! Request authentication.
//!
//! Two layers: a pre-shared admin key guarding organization provisioning, and
//! per-organization API keys guarding form and response management. Keys are
//! compared in constant time.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::Organization;
use crate::AppState;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header naming the organization a request acts for.
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// The organization resolved for the current request.
#[derive(Debug, Clone)]
pub struct CurrentOrganization(pub Organization);

/// Admin PSK layer. When no PSK is configured every request passes (dev mode).
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    match provided_key(request.headers()) {
        Some(key) if constant_time_compare(&key, &expected) => next.run(request).await,
        Some(_) => unauthorized("Invalid API key"),
        None => unauthorized("Missing or invalid API key"),
    }
}

/// Organization layer: resolves the caller's organization and makes it
/// available to handlers as a [`CurrentOrganization`] extension.
pub async fn organization_auth_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_organization(&state.repo, request.headers()).await {
        Ok(Some(organization)) => {
            request
                .extensions_mut()
                .insert(CurrentOrganization(organization));
            next.run(request).await
        }
        Ok(None) => unauthorized("Missing or invalid organization credentials"),
        Err(e) => e.into_response(),
    }
}

/// Given request headers, return the organization they authenticate as, or
/// `None` when the credentials are missing or wrong. Without an organization
/// header the API key alone identifies the organization.
pub async fn resolve_organization(
    repo: &Repository,
    headers: &HeaderMap,
) -> Result<Option<Organization>, AppError> {
    let Some(key) = provided_key(headers) else {
        return Ok(None);
    };

    let organization = match headers
        .get(ORGANIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(organization_id) => repo.get_organization(organization_id).await?,
        None => repo.get_organization_by_api_key(&key).await?,
    };
    Ok(organization.filter(|org| constant_time_compare(&key, &org.api_key)))
}

/// API key from `x-api-key`, falling back to an `Authorization: Bearer` token.
fn provided_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .map(|s| s.to_string())
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_provided_key_prefers_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("header-key"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer bearer-key"),
        );
        assert_eq!(provided_key(&headers).as_deref(), Some("header-key"));

        headers.remove(API_KEY_HEADER);
        assert_eq!(provided_key(&headers).as_deref(), Some("bearer-key"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(provided_key(&headers), None);
    }
}
