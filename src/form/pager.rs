//! Multi-step presentation: splitting a document at page breaks.

use serde::Serialize;

use super::Node;

/// Name of the page holding content before the first break.
pub const FIRST_PAGE_NAME: &str = "About";

/// A presentation-only group of top-level nodes. Recomputed on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<'a> {
    pub name: String,
    pub nodes: Vec<&'a Node>,
}

impl<'a> Page<'a> {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }
}

/// Split the root's direct children at page breaks. Never returns an empty
/// list; breaks nested deeper than the root's children are not boundaries.
pub fn paginate(root: &Node) -> Vec<Page<'_>> {
    let mut pages = Vec::new();
    let mut current = Page::named(FIRST_PAGE_NAME);

    for child in root.children() {
        match child {
            Node::PageBreak(page_break) => {
                pages.push(current);
                current = if page_break.name.is_empty() {
                    Page::named(format!("Page {}", pages.len() + 1))
                } else {
                    Page::named(page_break.name.clone())
                };
            }
            node => current.nodes.push(node),
        }
    }

    pages.push(current);
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Document, Field, FieldKind, InputField};

    fn input(id: &str) -> Node {
        Field::new(id, FieldKind::LongAnswer(InputField::default())).into()
    }

    fn names(pages: &[Page<'_>]) -> Vec<String> {
        pages.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_no_breaks_yields_single_page() {
        let document = Document::new(vec![input("a"), input("b")]);
        let pages = paginate(document.root());

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].name, FIRST_PAGE_NAME);
        assert_eq!(pages[0].nodes.len(), 2);
    }

    #[test]
    fn test_empty_document_yields_one_empty_page() {
        let document = Document::new(Vec::new());
        let pages = paginate(document.root());

        assert_eq!(pages.len(), 1);
        assert!(pages[0].nodes.is_empty());
    }

    #[test]
    fn test_break_naming() {
        let document = Document::new(vec![
            input("a"),
            Node::page_break(""),
            input("b"),
            Node::page_break("Contact details"),
            input("c"),
            Node::page_break(""),
        ]);
        let pages = paginate(document.root());

        assert_eq!(
            names(&pages),
            vec!["About", "Page 2", "Contact details", "Page 4"]
        );
        // Trailing break still opens a final, empty page.
        assert!(pages[3].nodes.is_empty());
    }

    #[test]
    fn test_pages_cover_all_non_break_children() {
        let document = Document::new(vec![
            Node::page_break("Start"),
            input("a"),
            Node::container("paragraph", vec![]),
            Node::page_break(""),
            input("b"),
        ]);
        let pages = paginate(document.root());

        let total: usize = pages.iter().map(|p| p.nodes.len()).sum();
        assert_eq!(total, 3);
        assert!(pages[0].nodes.is_empty());
        assert_eq!(names(&pages), vec!["About", "Start", "Page 3"]);
    }

    #[test]
    fn test_nested_breaks_are_ignored() {
        let document = Document::new(vec![
            input("a"),
            Node::container("section", vec![Node::page_break("Hidden")]),
        ]);
        let pages = paginate(document.root());

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].nodes.len(), 2);
    }
}
