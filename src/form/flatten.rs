//! Pre-order traversal of the document tree.

use super::Node;

/// Every node of the tree rooted at `root`, parents before children, root
/// first. Indexes into the result are stable for one read of a document only.
pub fn flatten(root: &Node) -> Vec<&Node> {
    let mut nodes = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        nodes.push(node);
        // Reversed so the first child is visited next.
        stack.extend(node.children().iter().rev());
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Document, Field, FieldKind, InputField};

    fn input(id: &str) -> Node {
        Field::new(id, FieldKind::ShortAnswer(InputField::default())).into()
    }

    #[test]
    fn test_flatten_is_pre_order() {
        let document = Document::new(vec![
            Node::container("paragraph", vec![input("a"), input("b")]),
            Node::page_break(""),
            Node::container(
                "section",
                vec![Node::container("paragraph", vec![input("c")]), input("d")],
            ),
        ]);

        let tags: Vec<String> = flatten(document.root())
            .into_iter()
            .map(|node| match node.as_field() {
                Some(field) => field.question_id.clone(),
                None => node.type_tag().to_string(),
            })
            .collect();

        assert_eq!(
            tags,
            vec!["doc", "paragraph", "a", "b", "page-break", "section", "paragraph", "c", "d"]
        );
    }

    #[test]
    fn test_flatten_root_first_and_deterministic() {
        let document = Document::new(vec![
            Node::container("paragraph", vec![input("x")]),
            input("y"),
        ]);

        let first = flatten(document.root());
        let second = flatten(document.root());

        assert!(std::ptr::eq(first[0], document.root()));
        assert_eq!(first, second);
        assert!(first.len() >= 1 + document.children().len());
    }

    #[test]
    fn test_flatten_empty_document() {
        let document = Document::new(Vec::new());
        assert_eq!(flatten(document.root()).len(), 1);
    }
}
