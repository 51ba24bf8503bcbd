//! Answerable field extraction.

use std::collections::HashMap;

use serde::Serialize;

use super::{FieldType, Node};

/// What validation needs to know about one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedField {
    pub question_id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Keep the field nodes of a flattened document, in order. Hidden fields are
/// never required, whatever the stored flag says.
pub fn extract_fields(nodes: &[&Node]) -> Vec<ExtractedField> {
    nodes
        .iter()
        .filter_map(|node| node.as_field())
        .map(|field| {
            let field_type = field.field_type();
            ExtractedField {
                question_id: field.question_id.clone(),
                field_type,
                required: field.required && field_type != FieldType::Hidden,
                label: field.label().map(str::to_string),
            }
        })
        .collect()
}

/// Index fields by questionId. A repeated id keeps the later field.
pub fn field_map(fields: &[ExtractedField]) -> HashMap<&str, &ExtractedField> {
    fields
        .iter()
        .map(|field| (field.question_id.as_str(), field))
        .collect()
}
