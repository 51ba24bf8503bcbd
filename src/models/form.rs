//! Form models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::form::{Document, Node, Page};

/// A form with its editor document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub published: bool,
    /// Editor document, serialized as its root `doc` node
    pub content: Document,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    pub version: i64,
}

/// Listing entry without the document body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub id: String,
    pub name: String,
    pub published: bool,
    pub updated_at: String,
    pub version: i64,
    pub response_count: i64,
}

/// Request body for creating a form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormRequest {
    pub name: String,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub published: Option<bool>,
}

/// Request body for updating a form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub published: Option<bool>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Owned copy of a page for the JSON API.
#[derive(Debug, Clone, Serialize)]
pub struct FormPage {
    pub name: String,
    pub nodes: Vec<Node>,
}

impl From<Page<'_>> for FormPage {
    fn from(page: Page<'_>) -> Self {
        Self {
            name: page.name,
            nodes: page.nodes.into_iter().cloned().collect(),
        }
    }
}

/// What respondents see behind a share link.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicForm {
    pub id: String,
    pub name: String,
    pub pages: Vec<FormPage>,
}
