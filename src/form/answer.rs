//! Submitted answers and their context-free constraints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::FieldType;

/// Maximum length, in characters, of a short answer.
pub const SHORT_ANSWER_MAX_CHARS: usize = 100;

/// Maximum length, in characters, of a long answer.
pub const LONG_ANSWER_MAX_CHARS: usize = 1000;

/// Longest address that fits an SMTP path.
const EMAIL_MAX_CHARS: usize = 254;

/// One entry of a submitted response, tagged with the type of the field it
/// claims to answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Answer {
    #[serde(rename_all = "camelCase")]
    ShortAnswer {
        question_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    LongAnswer {
        question_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Email {
        question_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Phone {
        question_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Number {
        question_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Radio {
        question_id: String,
        response: RadioResponse,
    },
    #[serde(rename_all = "camelCase")]
    Hidden {
        question_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<String>,
    },
}

/// Chosen option of a radio question, with free text when "other" is picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioResponse {
    pub option: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_value: Option<String>,
}

/// Answer that breaks its own type's rules.
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("Malformed answer: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Answer to {question_id} exceeds {max} characters")]
    TooLong { question_id: String, max: usize },

    #[error("Answer to {0} is not a valid email address")]
    InvalidEmail(String),

    #[error("Answer to {0} is not a valid phone number")]
    InvalidPhone(String),

    #[error("Answer to {0} is not a number")]
    NotNumeric(String),

    #[error("Answer to {0} has no option selected")]
    MissingOption(String),
}

impl Answer {
    pub fn question_id(&self) -> &str {
        match self {
            Answer::ShortAnswer { question_id, .. }
            | Answer::LongAnswer { question_id, .. }
            | Answer::Email { question_id, .. }
            | Answer::Phone { question_id, .. }
            | Answer::Number { question_id, .. }
            | Answer::Radio { question_id, .. }
            | Answer::Hidden { question_id, .. } => question_id,
        }
    }

    /// The field type this answer declares.
    pub fn answer_type(&self) -> FieldType {
        match self {
            Answer::ShortAnswer { .. } => FieldType::ShortAnswer,
            Answer::LongAnswer { .. } => FieldType::LongAnswer,
            Answer::Email { .. } => FieldType::Email,
            Answer::Phone { .. } => FieldType::Phone,
            Answer::Number { .. } => FieldType::Number,
            Answer::Radio { .. } => FieldType::Radio,
            Answer::Hidden { .. } => FieldType::Hidden,
        }
    }

    /// Strip surrounding whitespace from email, phone and number values so the
    /// stored value is the one that gets checked.
    pub fn normalize(&mut self) {
        if let Answer::Email { response, .. }
        | Answer::Phone { response, .. }
        | Answer::Number { response, .. } = self
        {
            if let Some(value) = response {
                let trimmed = value.trim();
                if trimmed.len() != value.len() {
                    *value = trimmed.to_string();
                }
            }
        }
    }

    /// Check the constraints of this answer's own type. Absent or blank values
    /// pass; whether a value is needed is decided by the form.
    pub fn check(&self) -> Result<(), AnswerError> {
        let question_id = self.question_id().to_string();

        match self {
            Answer::ShortAnswer { response, .. } => {
                check_length(&question_id, response, SHORT_ANSWER_MAX_CHARS)
            }
            Answer::LongAnswer { response, .. } => {
                check_length(&question_id, response, LONG_ANSWER_MAX_CHARS)
            }
            Answer::Email { response, .. } => match non_blank(response) {
                Some(email) if !is_valid_email(email) => {
                    Err(AnswerError::InvalidEmail(question_id))
                }
                _ => Ok(()),
            },
            Answer::Phone { response, .. } => match non_blank(response) {
                Some(phone) if !is_valid_phone(phone) => {
                    Err(AnswerError::InvalidPhone(question_id))
                }
                _ => Ok(()),
            },
            Answer::Number { response, .. } => match non_blank(response) {
                Some(number) if !is_numeric(number) => Err(AnswerError::NotNumeric(question_id)),
                _ => Ok(()),
            },
            Answer::Radio { response, .. } => {
                if response.option.trim().is_empty() {
                    Err(AnswerError::MissingOption(question_id))
                } else {
                    Ok(())
                }
            }
            Answer::Hidden { .. } => Ok(()),
        }
    }
}

/// Decode a JSON array of answers, normalize them and check each one.
pub fn parse_answers(value: Value) -> Result<Vec<Answer>, AnswerError> {
    let mut answers: Vec<Answer> = serde_json::from_value(value)?;
    answers.iter_mut().for_each(Answer::normalize);
    check_answers(&answers)?;
    Ok(answers)
}

/// Check every answer; the first failure wins.
pub fn check_answers(answers: &[Answer]) -> Result<(), AnswerError> {
    answers.iter().try_for_each(Answer::check)
}

/// The value as submitted, unless it is absent or whitespace only.
fn non_blank(response: &Option<String>) -> Option<&str> {
    response.as_deref().filter(|s| !s.trim().is_empty())
}

fn check_length(
    question_id: &str,
    response: &Option<String>,
    max: usize,
) -> Result<(), AnswerError> {
    match response {
        Some(text) if text.chars().count() > max => Err(AnswerError::TooLong {
            question_id: question_id.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Syntactic email check: one `@`, a non-empty local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().count() > EMAIL_MAX_CHARS || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
        && !domain.starts_with('-')
}

/// International phone number: a leading `+`, then digits that form a valid
/// number for an assigned country code. Single spaces, dashes or dots may
/// separate digits, and one parenthesized group of digits is allowed.
pub fn is_valid_phone(phone: &str) -> bool {
    let Some(rest) = phone.strip_prefix('+') else {
        return false;
    };
    if !has_clean_separators(rest) {
        return false;
    }

    phonenumber::parse(None, phone)
        .map(|number| phonenumber::is_valid(&number))
        .unwrap_or(false)
}

fn has_clean_separators(digits: &str) -> bool {
    let mut after_separator = true;
    let mut in_group = false;
    let mut seen_group = false;
    let mut group_digits = 0;

    for c in digits.chars() {
        match c {
            '0'..='9' => {
                after_separator = false;
                if in_group {
                    group_digits += 1;
                }
            }
            ' ' | '-' | '.' => {
                if after_separator || in_group {
                    return false;
                }
                after_separator = true;
            }
            '(' => {
                if seen_group {
                    return false;
                }
                in_group = true;
                seen_group = true;
                after_separator = false;
            }
            ')' => {
                if !in_group || group_digits == 0 {
                    return false;
                }
                in_group = false;
                after_separator = false;
            }
            _ => return false,
        }
    }

    !in_group && !after_separator
}

/// A string holding a finite decimal number.
pub fn is_numeric(number: &str) -> bool {
    // Rust accepts "inf" and "NaN"; only plain decimal notation is a number here.
    !number.is_empty()
        && number
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && number.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_tagged_answers() {
        let answers = parse_answers(json!([
            { "type": "short-answer", "questionId": "q1", "response": "hi" },
            { "type": "radio", "questionId": "q3", "response": { "option": "other", "otherValue": "C" } },
            { "type": "hidden", "questionId": "q4" }
        ]))
        .unwrap();

        assert_eq!(answers.len(), 3);
        assert_eq!(answers[0].question_id(), "q1");
        assert_eq!(answers[0].answer_type(), FieldType::ShortAnswer);
        assert_eq!(
            answers[1],
            Answer::Radio {
                question_id: "q3".to_string(),
                response: RadioResponse {
                    option: "other".to_string(),
                    other_value: Some("C".to_string()),
                },
            }
        );
        assert_eq!(
            answers[2],
            Answer::Hidden {
                question_id: "q4".to_string(),
                response: None
            }
        );
    }

    #[test]
    fn test_encode_uses_wire_names() {
        let answer = Answer::Email {
            question_id: "q2".to_string(),
            response: Some("a@b.co".to_string()),
        };
        let value = serde_json::to_value(&answer).unwrap();
        assert_eq!(
            value,
            json!({ "type": "email", "questionId": "q2", "response": "a@b.co" })
        );
    }

    #[test]
    fn test_shape_errors() {
        // radio without option
        assert!(matches!(
            parse_answers(json!([{ "type": "radio", "questionId": "q", "response": {} }])),
            Err(AnswerError::Malformed(_))
        ));
        // unknown type tag
        assert!(parse_answers(json!([{ "type": "page-break", "questionId": "q" }])).is_err());
        // missing questionId
        assert!(parse_answers(json!([{ "type": "email", "response": "a@b.co" }])).is_err());
        // not an array
        assert!(parse_answers(json!({ "type": "email" })).is_err());
    }

    #[test]
    fn test_radio_requires_non_empty_option() {
        let err = parse_answers(json!([
            { "type": "radio", "questionId": "q", "response": { "option": "  " } }
        ]))
        .unwrap_err();
        assert!(matches!(err, AnswerError::MissingOption(id) if id == "q"));
    }

    #[test]
    fn test_length_limits_count_characters() {
        let at_limit = "é".repeat(SHORT_ANSWER_MAX_CHARS);
        let short = Answer::ShortAnswer {
            question_id: "q".to_string(),
            response: Some(at_limit.clone()),
        };
        assert!(short.check().is_ok());

        let over = Answer::ShortAnswer {
            question_id: "q".to_string(),
            response: Some(format!("{}x", at_limit)),
        };
        assert!(matches!(
            over.check(),
            Err(AnswerError::TooLong { max: SHORT_ANSWER_MAX_CHARS, .. })
        ));

        let long = Answer::LongAnswer {
            question_id: "q".to_string(),
            response: Some("x".repeat(LONG_ANSWER_MAX_CHARS + 1)),
        };
        assert!(long.check().is_err());
    }

    #[test]
    fn test_email_validity() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("jane@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("jane@@example.com"));
        assert!(!is_valid_email("jane doe@example.com"));
        assert!(!is_valid_email("jane@example..com"));
    }

    #[test]
    fn test_phone_validity() {
        assert!(is_valid_phone("+12015550123"));
        assert!(is_valid_phone("+1 201-555-0123"));
        assert!(is_valid_phone("+1 (201) 555-0123"));
        assert!(is_valid_phone("+44 7400 123456"));
        assert!(!is_valid_phone("2015550123"));
        assert!(!is_valid_phone("+0123456789"));
        assert!(!is_valid_phone("+1234"));
        assert!(!is_valid_phone("+1234567890123456"));
        assert!(!is_valid_phone("+1 201 CALL NOW"));
    }

    #[test]
    fn test_phone_needs_assigned_country_and_possible_number() {
        // 999 is not a country calling code
        assert!(!is_valid_phone("+999 1234 5678"));
        // North American area codes never start with 0
        assert!(!is_valid_phone("+1 000 000 0000"));
    }

    #[test]
    fn test_phone_separators_are_well_formed() {
        assert!(!is_valid_phone("+1 ((((201)))) ---- 555 0123"));
        assert!(!is_valid_phone("+1 (201 555-0123"));
        assert!(!is_valid_phone("+1 201) 555-0123"));
        assert!(!is_valid_phone("+1 201--555-0123"));
        assert!(!is_valid_phone("+1 (201) (555) 0123"));
        assert!(!is_valid_phone("+1 () 201 555 0123"));
        assert!(!is_valid_phone("+1 201 555 0123-"));
        assert!(!is_valid_phone("+ 1 201 555 0123"));
    }

    #[test]
    fn test_numeric_strings() {
        assert!(is_numeric("42"));
        assert!(is_numeric("-3.5"));
        assert!(is_numeric("1e3"));
        assert!(!is_numeric("abc"));
        assert!(!is_numeric("inf"));
        assert!(!is_numeric("NaN"));
        assert!(!is_numeric("1e400"));
    }

    #[test]
    fn test_empty_values_pass_schema_checks() {
        for answer in [
            Answer::Email {
                question_id: "e".into(),
                response: Some(String::new()),
            },
            Answer::Phone {
                question_id: "p".into(),
                response: None,
            },
            Answer::Number {
                question_id: "n".into(),
                response: Some(" ".into()),
            },
        ] {
            assert!(answer.check().is_ok());
        }
    }

    #[test]
    fn test_checked_value_is_the_stored_value() {
        let padded = Answer::Email {
            question_id: "e".into(),
            response: Some("  a@b.co  ".into()),
        };
        assert!(matches!(padded.check(), Err(AnswerError::InvalidEmail(_))));

        let answers = parse_answers(json!([
            { "type": "email", "questionId": "e", "response": "  a@b.co  " },
            { "type": "phone", "questionId": "p", "response": " +1 201-555-0123\n" },
            { "type": "number", "questionId": "n", "response": " 42 " },
            { "type": "short-answer", "questionId": "s", "response": "  as typed " }
        ]))
        .unwrap();

        let values: Vec<Value> = answers
            .iter()
            .map(|a| serde_json::to_value(a).unwrap()["response"].clone())
            .collect();
        assert_eq!(
            values,
            vec![
                json!("a@b.co"),
                json!("+1 201-555-0123"),
                json!("42"),
                json!("  as typed "),
            ]
        );
    }
}
