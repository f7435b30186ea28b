//! Parser module - tree-sitter wrapper and node helpers
//!
//! ARCHITECTURE: This is the ONLY module that imports grammar crates.
//! The `Parser` struct itself lives in types.rs; this module carries the
//! small node-navigation helpers shared by the binder, the annotation
//! transformer, and the externs generator.

use tree_sitter::Node;

/// Slice the source text of a node.
///
/// tree-sitter byte ranges always fall on UTF-8 boundaries for valid
/// input, but the slice is still checked to avoid panics on trees built
/// from mismatched sources.
pub(crate) fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// First named child with the given kind.
pub(crate) fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// All named children with the given kind, in source order.
pub(crate) fn children_of_kind<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() == kind)
        .collect()
}

/// Any child (named or anonymous token) whose kind matches.
///
/// Modifier keywords like `static` or `abstract` surface as anonymous
/// tokens, so `named_children` alone cannot see them.
pub(crate) fn token_child<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// True when the node carries the given modifier token.
pub(crate) fn has_modifier(node: Node, kind: &str) -> bool {
    token_child(node, kind).is_some()
}

/// The `type_parameters` list of a declaration, if any.
pub(crate) fn type_parameters<'t>(node: Node<'t>) -> Option<Node<'t>> {
    node.child_by_field_name("type_parameters")
        .or_else(|| child_of_kind(node, "type_parameters"))
}

/// The body of a class-like, namespace, or enum declaration, tolerant of
/// field-name differences across grammar revisions.
pub(crate) fn declaration_body<'t>(node: Node<'t>) -> Option<Node<'t>> {
    node.child_by_field_name("body")
        .or_else(|| child_of_kind(node, "class_body"))
        .or_else(|| child_of_kind(node, "interface_body"))
        .or_else(|| child_of_kind(node, "object_type"))
        .or_else(|| child_of_kind(node, "enum_body"))
        .or_else(|| child_of_kind(node, "statement_block"))
}

/// The leading structured comment of a statement, if one is attached.
///
/// A structured comment is a `/** ... */` block immediately preceding the
/// node (possibly across several plain comments), with only whitespace in
/// between. Plain comments are never treated as structured.
pub(crate) fn leading_jsdoc<'t>(node: Node<'t>, source: &str) -> Option<Node<'t>> {
    let mut cur = node;
    loop {
        let prev = cur.prev_sibling()?;
        if prev.kind() != "comment" {
            return None;
        }
        // Only whitespace may separate the comment from what follows it.
        if !source
            .get(prev.end_byte()..cur.start_byte())
            .is_some_and(|gap| gap.trim().is_empty())
        {
            return None;
        }
        let text = node_text(prev, source);
        if text.starts_with("/**") && text.ends_with("*/") {
            return Some(prev);
        }
        // A plain comment sits between the doc block and the node; keep
        // scanning backwards in case a structured comment precedes it.
        cur = prev;
    }
}

/// Indentation of the line the node starts on.
pub(crate) fn line_indent(node: Node, source: &str) -> String {
    let start = node.start_byte();
    let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    source[line_start..start]
        .chars()
        .take_while(|c| c.is_whitespace())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Unwrapping is acceptable in tests
mod tests {
    use super::*;
    use crate::Parser;

    #[test]
    fn test_parser_typescript() {
        let source = "function test(x: number): string { return String(x); }";
        let mut parser = Parser::new().unwrap();
        let result = parser.parse(source);
        assert!(result.is_ok());
    }

    #[test]
    fn test_parser_invalid_syntax() {
        let source = "function {{{{{ this is broken";
        let mut parser = Parser::new().unwrap();
        // tree-sitter is error-tolerant, so this still returns a tree
        // with error nodes
        assert!(parser.parse(source).is_ok());
    }

    #[test]
    fn test_leading_jsdoc() {
        let source = "/** @type {number} */\nconst x = 1;\n// plain\nconst y = 2;";
        let mut parser = Parser::new().unwrap();
        let tree = parser.parse(source).unwrap();
        let root = tree.root_node();

        let first = root.named_child(1).unwrap();
        assert_eq!(first.kind(), "lexical_declaration");
        assert!(leading_jsdoc(first, source).is_some());

        let second = root.named_child(3).unwrap();
        assert_eq!(second.kind(), "lexical_declaration");
        assert!(leading_jsdoc(second, source).is_none());
    }

    #[test]
    fn test_modifier_detection() {
        let source = "abstract class C { static x: number = 1; }";
        let mut parser = Parser::new().unwrap();
        let tree = parser.parse(source).unwrap();
        let class = tree.root_node().named_child(0).unwrap();
        assert_eq!(class.kind(), "abstract_class_declaration");
        assert!(has_modifier(class, "abstract"));
    }
}
