//! Stored response models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::form::Answer;

/// Where a submission came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Submission metadata recorded next to the answers.
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    pub user_id: Option<String>,
    pub sender: SenderInfo,
}

/// A verified response. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResponse {
    pub id: String,
    pub form_id: String,
    pub answers: Vec<Answer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub sender: SenderInfo,
    pub created_at: String,
}

/// Request body for a submission. Answers stay raw JSON until verified.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponseRequest {
    pub answers: Value,
}

/// Request body for deleting several responses at once.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<String>,
}

/// Result of a bulk delete.
#[derive(Debug, Clone, Serialize)]
pub struct BulkDeleteResult {
    pub deleted: u64,
    /// Responses left on the form afterwards
    pub remaining: i64,
}
