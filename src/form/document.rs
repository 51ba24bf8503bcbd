//! Form document model.
//!
//! A document is the JSON tree produced by the block editor: every node has a
//! `type` tag, optional `attrs`, and optional `content` children. Field and
//! page-break tags are decoded into dedicated variants, everything else
//! (paragraphs, headings, text runs, rules) is kept as an opaque container so
//! it survives a save round-trip untouched.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use super::flatten;

/// Type tag of the document root.
pub const ROOT_TYPE: &str = "doc";

/// Type tag of a page-break marker.
pub const PAGE_BREAK_TYPE: &str = "page-break";

/// Answerable field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    ShortAnswer,
    LongAnswer,
    Email,
    Phone,
    Number,
    Radio,
    Hidden,
}

/// Node type tags that count as answerable fields. UI code listing fields must
/// use this same set.
pub const FIELD_TYPES: [FieldType; 7] = [
    FieldType::ShortAnswer,
    FieldType::LongAnswer,
    FieldType::Email,
    FieldType::Phone,
    FieldType::Number,
    FieldType::Radio,
    FieldType::Hidden,
];

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::ShortAnswer => "short-answer",
            FieldType::LongAnswer => "long-answer",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Number => "number",
            FieldType::Radio => "radio",
            FieldType::Hidden => "hidden",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        FIELD_TYPES.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload shared by the text-like inputs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputField {
    pub label: String,
    pub placeholder: Option<String>,
}

/// Single choice question.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RadioField {
    pub label: String,
    pub options: Vec<String>,
    pub allow_other: bool,
}

/// Value captured without user input, typically from a URL parameter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HiddenField {
    /// URL parameter the value is read from
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    ShortAnswer(InputField),
    LongAnswer(InputField),
    Email(InputField),
    Phone(InputField),
    Number(InputField),
    Radio(RadioField),
    Hidden(HiddenField),
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::ShortAnswer(_) => FieldType::ShortAnswer,
            FieldKind::LongAnswer(_) => FieldType::LongAnswer,
            FieldKind::Email(_) => FieldType::Email,
            FieldKind::Phone(_) => FieldType::Phone,
            FieldKind::Number(_) => FieldType::Number,
            FieldKind::Radio(_) => FieldType::Radio,
            FieldKind::Hidden(_) => FieldType::Hidden,
        }
    }
}

/// An answerable question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Assigned once when the field is created, never derived from position.
    pub question_id: String,
    pub required: bool,
    pub kind: FieldKind,
}

impl Field {
    #[cfg(test)]
    pub fn new(question_id: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            question_id: question_id.into(),
            required: false,
            kind,
        }
    }

    #[cfg(test)]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::ShortAnswer(input)
            | FieldKind::LongAnswer(input)
            | FieldKind::Email(input)
            | FieldKind::Phone(input)
            | FieldKind::Number(input) => Some(&input.label),
            FieldKind::Radio(radio) => Some(&radio.label),
            FieldKind::Hidden(hidden) => hidden.name.as_deref(),
        }
    }

    fn from_attrs(field_type: FieldType, attrs: &Map<String, Value>) -> Result<Self, ParseError> {
        let tag = field_type.as_str();
        let question_id = string_attr(attrs, tag, "questionId")?.unwrap_or_default();
        let required = bool_attr(attrs, tag, "required")?;

        let input = || -> Result<InputField, ParseError> {
            Ok(InputField {
                label: string_attr(attrs, tag, "label")?.unwrap_or_default(),
                placeholder: string_attr(attrs, tag, "placeholder")?,
            })
        };

        let kind = match field_type {
            FieldType::ShortAnswer => FieldKind::ShortAnswer(input()?),
            FieldType::LongAnswer => FieldKind::LongAnswer(input()?),
            FieldType::Email => FieldKind::Email(input()?),
            FieldType::Phone => FieldKind::Phone(input()?),
            FieldType::Number => FieldKind::Number(input()?),
            FieldType::Radio => FieldKind::Radio(RadioField {
                label: string_attr(attrs, tag, "label")?.unwrap_or_default(),
                options: string_list_attr(attrs, tag, "options")?,
                allow_other: bool_attr(attrs, tag, "allowOther")?,
            }),
            FieldType::Hidden => FieldKind::Hidden(HiddenField {
                name: string_attr(attrs, tag, "name")?,
                value: string_attr(attrs, tag, "value")?,
            }),
        };

        Ok(Self {
            question_id,
            required,
            kind,
        })
    }

    fn to_attrs(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert("questionId".into(), Value::from(self.question_id.as_str()));
        attrs.insert("required".into(), Value::from(self.required));

        match &self.kind {
            FieldKind::ShortAnswer(input)
            | FieldKind::LongAnswer(input)
            | FieldKind::Email(input)
            | FieldKind::Phone(input)
            | FieldKind::Number(input) => {
                attrs.insert("label".into(), Value::from(input.label.as_str()));
                if let Some(placeholder) = &input.placeholder {
                    attrs.insert("placeholder".into(), Value::from(placeholder.as_str()));
                }
            }
            FieldKind::Radio(radio) => {
                attrs.insert("label".into(), Value::from(radio.label.as_str()));
                attrs.insert("options".into(), Value::from(radio.options.clone()));
                attrs.insert("allowOther".into(), Value::from(radio.allow_other));
            }
            FieldKind::Hidden(hidden) => {
                if let Some(name) = &hidden.name {
                    attrs.insert("name".into(), Value::from(name.as_str()));
                }
                if let Some(value) = &hidden.value {
                    attrs.insert("value".into(), Value::from(value.as_str()));
                }
            }
        }

        attrs
    }
}

/// Structural or decorative node: the root, paragraphs, headings, text runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Container {
    pub kind: String,
    pub attrs: Option<Map<String, Value>>,
    pub text: Option<String>,
    pub marks: Option<Value>,
    pub children: Vec<Node>,
}

impl Container {
    pub fn new(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            kind: kind.into(),
            children,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageBreak {
    /// Display name of the page that starts here; empty means auto-named.
    pub name: String,
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub enum Node {
    Container(Container),
    Field(Field),
    PageBreak(PageBreak),
}

impl Node {
    /// Shorthand for a container node.
    pub fn container(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Container(Container::new(kind, children))
    }

    pub fn page_break(name: impl Into<String>) -> Self {
        Node::PageBreak(PageBreak { name: name.into() })
    }

    pub fn type_tag(&self) -> &str {
        match self {
            Node::Container(container) => &container.kind,
            Node::Field(field) => field.field_type().as_str(),
            Node::PageBreak(_) => PAGE_BREAK_TYPE,
        }
    }

    /// Child nodes; leaves have none.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Container(container) => &container.children,
            Node::Field(_) | Node::PageBreak(_) => &[],
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Node::Field(field) => Some(field),
            _ => None,
        }
    }
}

impl From<Field> for Node {
    fn from(field: Field) -> Self {
        Node::Field(field)
    }
}

/// Editor wire shape of a node.
#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attrs: Option<Map<String, Value>>,
    #[serde(default)]
    content: Vec<Node>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    marks: Option<Value>,
}

#[derive(Serialize)]
struct RawNodeRef<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attrs: Option<Cow<'a, Map<String, Value>>>,
    #[serde(skip_serializing_if = "no_children")]
    content: &'a [Node],
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    marks: Option<&'a Value>,
}

impl TryFrom<RawNode> for Node {
    type Error = ParseError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        if raw.kind == PAGE_BREAK_TYPE {
            let name = match &raw.attrs {
                Some(attrs) => string_attr(attrs, PAGE_BREAK_TYPE, "name")?.unwrap_or_default(),
                None => String::new(),
            };
            return Ok(Node::page_break(name));
        }

        if let Some(field_type) = FieldType::from_tag(&raw.kind) {
            let attrs = raw.attrs.unwrap_or_default();
            return Field::from_attrs(field_type, &attrs).map(Node::Field);
        }

        Ok(Node::Container(Container {
            kind: raw.kind,
            attrs: raw.attrs,
            text: raw.text,
            marks: raw.marks,
            children: raw.content,
        }))
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = match self {
            Node::Container(container) => RawNodeRef {
                kind: &container.kind,
                attrs: container.attrs.as_ref().map(Cow::Borrowed),
                content: &container.children,
                text: container.text.as_deref(),
                marks: container.marks.as_ref(),
            },
            Node::Field(field) => RawNodeRef {
                kind: field.field_type().as_str(),
                attrs: Some(Cow::Owned(field.to_attrs())),
                content: &[],
                text: None,
                marks: None,
            },
            Node::PageBreak(page_break) => {
                let mut attrs = Map::new();
                attrs.insert("name".into(), Value::from(page_break.name.as_str()));
                RawNodeRef {
                    kind: PAGE_BREAK_TYPE,
                    attrs: Some(Cow::Owned(attrs)),
                    content: &[],
                    text: None,
                    marks: None,
                }
            }
        };
        raw.serialize(serializer)
    }
}

/// Reasons a stored or submitted document cannot be used.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Document root must be a `doc` node, found `{0}`")]
    InvalidRoot(String),

    #[error("Invalid attribute `{attr}` on `{node}` node")]
    InvalidAttribute { node: String, attr: &'static str },

    #[error("Page breaks must be direct children of the document root")]
    NestedPageBreak,

    #[error("A `{0}` field has no questionId")]
    MissingQuestionId(FieldType),

    #[error("Duplicate questionId `{0}`")]
    DuplicateQuestionId(String),
}

/// A parsed form document with exactly one root container. Serializes as its
/// root node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document {
    root: Node,
}

impl Document {
    /// Build a document in memory from the root's children. No integrity
    /// checks are applied.
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            root: Node::container(ROOT_TYPE, children),
        }
    }

    /// Parse stored document JSON.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Decode a document and reject it unless every field carries a unique
    /// questionId and page breaks sit directly under the root.
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        let document = Self::decode(value)?;
        document.check_integrity()?;
        Ok(document)
    }

    /// Decode a document being saved from the editor. Fields created without
    /// an identifier get a fresh one; the number assigned is returned.
    pub fn parse_draft(value: Value) -> Result<(Self, usize), ParseError> {
        let mut document = Self::decode(value)?;
        let assigned = document.assign_missing_question_ids();
        document.check_integrity()?;
        Ok((document, assigned))
    }

    fn decode(value: Value) -> Result<Self, ParseError> {
        let root: Node = serde_json::from_value(value)?;
        if matches!(&root, Node::Container(container) if container.kind == ROOT_TYPE) {
            Ok(Self { root })
        } else {
            Err(ParseError::InvalidRoot(root.type_tag().to_string()))
        }
    }

    fn check_integrity(&self) -> Result<(), ParseError> {
        for child in self.children() {
            if child.children().iter().any(contains_page_break) {
                return Err(ParseError::NestedPageBreak);
            }
        }

        let mut seen = HashSet::new();
        for field in flatten(&self.root).into_iter().filter_map(Node::as_field) {
            if field.question_id.is_empty() {
                return Err(ParseError::MissingQuestionId(field.field_type()));
            }
            if !seen.insert(field.question_id.as_str()) {
                return Err(ParseError::DuplicateQuestionId(field.question_id.clone()));
            }
        }

        Ok(())
    }

    /// Give every field with an empty questionId a new identifier. Existing
    /// identifiers are left alone.
    pub fn assign_missing_question_ids(&mut self) -> usize {
        fn visit(node: &mut Node) -> usize {
            match node {
                Node::Field(field) if field.question_id.is_empty() => {
                    field.question_id = new_question_id();
                    1
                }
                Node::Container(container) => container.children.iter_mut().map(visit).sum(),
                _ => 0,
            }
        }
        visit(&mut self.root)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Top-level nodes, in document order.
    pub fn children(&self) -> &[Node] {
        self.root.children()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.root)
    }
}

/// Generate a new collision-resistant question identifier.
pub fn new_question_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn no_children(nodes: &&[Node]) -> bool {
    nodes.is_empty()
}

fn contains_page_break(node: &Node) -> bool {
    matches!(node, Node::PageBreak(_)) || node.children().iter().any(contains_page_break)
}

fn string_attr(
    attrs: &Map<String, Value>,
    node: &str,
    attr: &'static str,
) -> Result<Option<String>, ParseError> {
    match attrs.get(attr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid_attr(node, attr)),
    }
}

fn bool_attr(
    attrs: &Map<String, Value>,
    node: &str,
    attr: &'static str,
) -> Result<bool, ParseError> {
    match attrs.get(attr) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(invalid_attr(node, attr)),
    }
}

fn string_list_attr(
    attrs: &Map<String, Value>,
    node: &str,
    attr: &'static str,
) -> Result<Vec<String>, ParseError> {
    match attrs.get(attr) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(invalid_attr(node, attr)),
            })
            .collect(),
        Some(_) => Err(invalid_attr(node, attr)),
    }
}

fn invalid_attr(node: &str, attr: &'static str) -> ParseError {
    ParseError::InvalidAttribute {
        node: node.to_string(),
        attr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "type": "doc",
            "content": [
                {
                    "type": "heading",
                    "attrs": { "level": 1 },
                    "content": [{ "type": "text", "text": "Sign up" }]
                },
                {
                    "type": "short-answer",
                    "attrs": { "questionId": "q1", "required": true, "label": "Name" }
                },
                { "type": "page-break", "attrs": { "name": "Contact" } },
                {
                    "type": "radio",
                    "attrs": {
                        "questionId": "q2",
                        "label": "Plan",
                        "options": ["Free", "Pro"],
                        "allowOther": true
                    }
                },
                { "type": "hidden", "attrs": { "questionId": "q3", "name": "ref" } }
            ]
        })
    }

    #[test]
    fn test_parse_decodes_fields_and_breaks() {
        let document = Document::from_value(sample()).unwrap();
        let children = document.children();

        assert_eq!(children.len(), 5);
        assert_eq!(children[0].type_tag(), "heading");

        let name = children[1].as_field().unwrap();
        assert_eq!(name.question_id, "q1");
        assert!(name.required);
        assert_eq!(name.field_type(), FieldType::ShortAnswer);
        assert_eq!(name.label(), Some("Name"));

        assert_eq!(children[2], Node::page_break("Contact"));

        match &children[3].as_field().unwrap().kind {
            FieldKind::Radio(radio) => {
                assert_eq!(radio.options, vec!["Free", "Pro"]);
                assert!(radio.allow_other);
            }
            other => panic!("expected radio, got {:?}", other),
        }
    }

    #[test]
    fn test_serialize_round_trip_keeps_unknown_nodes() {
        let document = Document::from_value(sample()).unwrap();
        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(value["content"][0]["attrs"]["level"], 1);
        assert_eq!(value["content"][0]["content"][0]["text"], "Sign up");
        assert_eq!(value["content"][1]["attrs"]["questionId"], "q1");

        let reparsed = Document::from_value(value).unwrap();
        assert_eq!(reparsed, document);
    }

    #[test]
    fn test_parse_raw_string() {
        let raw = sample().to_string();
        let document = Document::parse(&raw).unwrap();
        assert_eq!(document.children().len(), 5);

        assert!(matches!(
            Document::parse("{not json"),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_doc_root() {
        let err = Document::from_value(json!({ "type": "paragraph" })).unwrap_err();
        assert!(matches!(err, ParseError::InvalidRoot(kind) if kind == "paragraph"));
    }

    #[test]
    fn test_parse_rejects_duplicate_question_ids() {
        let value = json!({
            "type": "doc",
            "content": [
                { "type": "email", "attrs": { "questionId": "dup" } },
                {
                    "type": "paragraph",
                    "content": [{ "type": "phone", "attrs": { "questionId": "dup" } }]
                }
            ]
        });

        let err = Document::from_value(value).unwrap_err();
        assert!(matches!(err, ParseError::DuplicateQuestionId(id) if id == "dup"));
    }

    #[test]
    fn test_parse_rejects_nested_page_break() {
        let value = json!({
            "type": "doc",
            "content": [{ "type": "paragraph", "content": [{ "type": "page-break" }] }]
        });

        assert!(matches!(
            Document::from_value(value),
            Err(ParseError::NestedPageBreak)
        ));
    }

    #[test]
    fn test_parse_rejects_bad_attribute_types() {
        let value = json!({
            "type": "doc",
            "content": [{ "type": "radio", "attrs": { "questionId": "q", "options": [1, 2] } }]
        });

        assert!(Document::from_value(value).is_err());
    }

    #[test]
    fn test_strict_parse_requires_question_ids() {
        let value = json!({
            "type": "doc",
            "content": [{ "type": "number", "attrs": { "label": "Age" } }]
        });

        assert!(matches!(
            Document::from_value(value),
            Err(ParseError::MissingQuestionId(FieldType::Number))
        ));
    }

    #[test]
    fn test_parse_draft_assigns_ids_once() {
        let value = json!({
            "type": "doc",
            "content": [
                { "type": "number", "attrs": { "label": "Age" } },
                { "type": "email", "attrs": { "questionId": "keep" } }
            ]
        });

        let (document, assigned) = Document::parse_draft(value).unwrap();
        assert_eq!(assigned, 1);

        let generated = document.children()[0].as_field().unwrap().question_id.clone();
        assert_eq!(generated.len(), 32);
        assert_eq!(document.children()[1].as_field().unwrap().question_id, "keep");

        // Saving again must not regenerate anything.
        let value = serde_json::to_value(&document).unwrap();
        let (again, assigned) = Document::parse_draft(value).unwrap();
        assert_eq!(assigned, 0);
        assert_eq!(again.children()[0].as_field().unwrap().question_id, generated);
    }

    #[test]
    fn test_new_question_ids_are_distinct() {
        assert_ne!(new_question_id(), new_question_id());
    }

    #[test]
    fn test_field_type_tags() {
        for field_type in FIELD_TYPES {
            assert_eq!(FieldType::from_tag(field_type.as_str()), Some(field_type));
        }
        assert_eq!(FieldType::from_tag("page-break"), None);
    }
}
