//! Response verification against the live form document.
//!
//! A submission is checked against the document as it is now, not against the
//! version the respondent loaded. Gates run in a fixed order and the first
//! failure rejects the whole submission.

use serde_json::Value;
use thiserror::Error;

use super::{
    check_answers, extract_fields, field_map, flatten, parse_answers, Answer, AnswerError,
    Document, FieldType,
};

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Invalid response: {0}")]
    SchemaInvalid(#[from] AnswerError),

    #[error("This form has no questions to answer")]
    NoFields,

    #[error("Question {0} is required")]
    MissingRequired(String),

    #[error("Question {0} does not exist on this form")]
    UnknownQuestion(String),

    #[error("Question {question_id} expects a {expected} answer, got {actual}")]
    TypeMismatch {
        question_id: String,
        expected: FieldType,
        actual: FieldType,
    },
}

impl VerifyError {
    /// Stable kebab-case name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::SchemaInvalid(_) => "schema-invalid",
            VerifyError::NoFields => "no-fields",
            VerifyError::MissingRequired(_) => "missing-required",
            VerifyError::UnknownQuestion(_) => "unknown-question",
            VerifyError::TypeMismatch { .. } => "type-mismatch",
        }
    }
}

/// Check `answers` against `document`.
pub fn verify(answers: &[Answer], document: &Document) -> Result<(), VerifyError> {
    check_answers(answers)?;

    let fields = extract_fields(&flatten(document.root()));
    if fields.is_empty() && !answers.is_empty() {
        return Err(VerifyError::NoFields);
    }
    let by_id = field_map(&fields);

    for field in fields.iter().filter(|f| f.required) {
        if !answers.iter().any(|a| a.question_id() == field.question_id) {
            return Err(VerifyError::MissingRequired(field.question_id.clone()));
        }
    }

    let mut resolved = Vec::with_capacity(answers.len());
    for answer in answers {
        match by_id.get(answer.question_id()) {
            Some(field) => resolved.push((answer, *field)),
            None => return Err(VerifyError::UnknownQuestion(answer.question_id().to_string())),
        }
    }

    // Inputs must match their exact subtype, not just any text type.
    for (answer, field) in resolved {
        if answer.answer_type() != field.field_type {
            return Err(VerifyError::TypeMismatch {
                question_id: field.question_id.clone(),
                expected: field.field_type,
                actual: answer.answer_type(),
            });
        }
    }

    Ok(())
}

/// Decode a raw JSON answer array and verify it; returns the decoded answers
/// ready to persist.
pub fn verify_value(value: Value, document: &Document) -> Result<Vec<Answer>, VerifyError> {
    let answers = parse_answers(value)?;
    verify(&answers, document)?;
    Ok(answers)
}
