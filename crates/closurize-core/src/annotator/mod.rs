//! Annotation Transformer
//!
//! ARCHITECTURE: A tree visitor over one non-declaration source file. For
//! each statement it decides what comment annotation to attach, rewrites
//! the node's shape where the annotation dialect demands it (interfaces
//! become functions, casts become parenthesized comments, multi-declarator
//! statements split), and erases every piece of typed-dialect syntax so
//! the output is plain JavaScript. All rewrites are byte-range edits
//! spliced at the end; untouched runtime code survives byte-for-byte.

pub(crate) mod members;

use tree_sitter::Node;

use crate::checker::binder::{is_type_kind, resolve_module_spec, string_value};
use crate::checker::ty::Type;
use crate::checker::Checker;
use crate::jsdoc::{escape_illegal_tags, Tag};
use crate::parser::{
    child_of_kind, children_of_kind, has_modifier, leading_jsdoc, line_indent, node_text,
    token_child,
};
use crate::rewrite::Rewriter;
use crate::translator::ModuleTypeTranslator;
use crate::Result;

/// Maximum visitor recursion depth; beyond this the subtree passes through
/// unrewritten rather than overflowing the stack.
const MAX_VISIT_DEPTH: usize = 400;

/// Rewrite one implementation file. Returns the annotated source text;
/// diagnostics accumulate on the translator.
pub(crate) fn annotate_source_file<'p>(
    mtt: &ModuleTypeTranslator<'p>,
    root: Node<'p>,
) -> Result<String> {
    let mut annotator = Annotator {
        mtt,
        rw: Rewriter::new(),
    };
    let mut cursor = root.walk();
    let children: Vec<Node> = root.named_children(&mut cursor).collect();
    for child in children {
        annotator.visit_statement(child, child, 0)?;
    }
    mtt.insert_forward_declares(root, &mut annotator.rw);
    annotator.rw.apply(mtt.source)
}

struct Annotator<'a, 'p> {
    mtt: &'a ModuleTypeTranslator<'p>,
    rw: Rewriter,
}

impl<'a, 'p> Annotator<'a, 'p> {
    fn source(&self) -> &'p str {
        self.mtt.source
    }

    // ========================================================================
    // Statement dispatch
    // ========================================================================

    /// `anchor` is the outermost statement the leading comment belongs to
    /// (the export wrapper when present).
    fn visit_statement(&mut self, stmt: Node<'p>, anchor: Node<'p>, depth: usize) -> Result<()> {
        if depth > MAX_VISIT_DEPTH {
            return Ok(());
        }
        match stmt.kind() {
            "export_statement" => {
                if token_child(stmt, "type").is_some() {
                    // `export type {...}` carries no runtime meaning.
                    self.delete_statement(stmt);
                    return Ok(());
                }
                if let Some(decl) = stmt.child_by_field_name("declaration") {
                    return self.visit_statement(decl, stmt, depth + 1);
                }
                if let Some(value) = stmt.child_by_field_name("value") {
                    return self.visit_expression(value, depth + 1);
                }
                // Re-exports keep the target's type namespace reachable.
                if let Some(source_node) = stmt.child_by_field_name("source") {
                    let spec = string_value(source_node, self.source());
                    let resolved = self.resolve_with_host(&spec);
                    self.mtt.forward_declare(&resolved, true, false);
                }
                Ok(())
            }
            "import_statement" => self.visit_import(stmt),
            "ambient_declaration" => {
                // Ambient code emits nothing at runtime and is never
                // visited further; the externs path owns it.
                self.delete_statement(stmt);
                Ok(())
            }
            "class_declaration" | "abstract_class_declaration" => {
                self.visit_class(stmt, anchor, depth)
            }
            "interface_declaration" => self.visit_interface(stmt, anchor),
            "function_declaration" | "generator_function_declaration" => {
                self.visit_function_like(stmt, anchor, depth)
            }
            "function_signature" => {
                // Bodiless overload signature: no runtime form.
                self.delete_statement(stmt);
                Ok(())
            }
            "lexical_declaration" | "variable_declaration" => {
                self.visit_variable_statement(stmt, anchor, depth)
            }
            "type_alias_declaration" => self.visit_type_alias(stmt, anchor),
            "enum_declaration" => self.visit_enum(stmt, anchor, depth),
            "internal_module" | "module" => {
                self.mtt
                    .error(stmt, "namespaces are not supported in implementation files");
                self.delete_statement(stmt);
                Ok(())
            }
            "statement_block" => {
                let mut cursor = stmt.walk();
                let children: Vec<Node> = stmt.named_children(&mut cursor).collect();
                for child in children {
                    self.visit_statement(child, child, depth + 1)?;
                }
                Ok(())
            }
            _ => self.visit_expression(stmt, depth + 1),
        }
    }

    fn delete_statement(&mut self, stmt: Node) {
        let mut start = stmt.start_byte();
        if let Some(comment) = leading_jsdoc(stmt, self.source()) {
            start = comment.start_byte();
        }
        let mut end = stmt.end_byte();
        if self.source()[end..].starts_with('\n') {
            end += 1;
        }
        self.rw.delete(start, end);
    }

    // ========================================================================
    // Imports
    // ========================================================================

    fn resolve_with_host(&self, spec: &str) -> String {
        let mut resolved = resolve_module_spec(self.mtt.module_path, spec);
        if self.mtt.host.convert_index_import_shorthand() {
            if let Some(stripped) = resolved.strip_suffix("/index") {
                resolved = stripped.to_string();
            }
        }
        resolved
    }

    fn visit_import(&mut self, stmt: Node<'p>) -> Result<()> {
        let Some(source_node) = stmt.child_by_field_name("source") else {
            return Ok(());
        };
        let clause = child_of_kind(stmt, "import_clause")
            .or_else(|| child_of_kind(stmt, "import_require_clause"));
        let Some(clause) = clause else {
            // Side-effect import: pass through untouched.
            return Ok(());
        };

        let spec = string_value(source_node, self.source());
        let resolved = self.resolve_with_host(&spec);
        let default_import = clause
            .named_child(0)
            .is_some_and(|c| c.kind() == "identifier");
        self.mtt.forward_declare(&resolved, true, default_import);

        if token_child(stmt, "type").is_some() || token_child(clause, "type").is_some() {
            // `import type` never loads at runtime; the forward declare
            // above is its entire output.
            self.delete_statement(stmt);
            return Ok(());
        }

        // Inline type-only specifiers: `import {type A, B}`.
        if let Some(named) = child_of_kind(clause, "named_imports") {
            for specifier in children_of_kind(named, "import_specifier") {
                if token_child(specifier, "type").is_none() {
                    continue;
                }
                let mut start = specifier.start_byte();
                let mut end = specifier.end_byte();
                if let Some(next) = specifier.next_sibling().filter(|n| n.kind() == ",") {
                    end = next.end_byte();
                } else if let Some(prev) = specifier.prev_sibling().filter(|n| n.kind() == ",") {
                    start = prev.start_byte();
                }
                self.rw.delete(start, end);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Classes and interfaces
    // ========================================================================

    fn visit_class(&mut self, decl: Node<'p>, anchor: Node<'p>, depth: usize) -> Result<()> {
        let source = self.source();
        let name = decl
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string())
            .unwrap_or_default();
        let indent = line_indent(anchor, source);

        let mut mjsdoc = self.mtt.get_mutable_jsdoc(anchor);
        let mut tags = escape_illegal_tags(std::mem::take(&mut mjsdoc.tags));

        if decl.kind() == "abstract_class_declaration" {
            tags.push(Tag::marker("abstract"));
            if let Some(token) = token_child(decl, "abstract") {
                self.rw
                    .delete_with_trailing_space(token.start_byte(), token.end_byte(), source);
            }
        }

        self.template_tag(decl, &mut tags);
        tags.extend(members::heritage_tags(self.mtt, decl, false, false));
        self.erase_heritage_syntax(decl);

        // Snapshot before the constructor is visited: visiting strips the
        // parameter-property comments the declaration reads from.
        let member_decl = members::member_type_declaration(self.mtt, decl, &name, false, &indent);

        if let Some(body) = crate::parser::declaration_body(decl) {
            self.visit_class_members(body, depth)?;
        }

        mjsdoc.tags = tags;
        mjsdoc.update_comment(&mut self.rw);

        if let Some(text) = member_decl {
            self.rw
                .insert(anchor.end_byte(), format!("\n{indent}{text}"));
        }
        Ok(())
    }

    fn visit_class_members(&mut self, body: Node<'p>, depth: usize) -> Result<()> {
        let mut cursor = body.walk();
        let member_nodes: Vec<Node> = body.named_children(&mut cursor).collect();
        for member in member_nodes {
            match member.kind() {
                "method_definition" => {
                    let is_ctor = member
                        .child_by_field_name("name")
                        .is_some_and(|n| node_text(n, self.source()) == "constructor");
                    if is_ctor {
                        self.visit_constructor(member, depth)?;
                    } else {
                        self.visit_function_like(member, member, depth)?;
                    }
                }
                "method_signature" | "abstract_method_signature" | "index_signature" => {
                    self.delete_member(member);
                }
                "public_field_definition" => self.visit_field(member, depth)?,
                "class_static_block" => {
                    if let Some(block) = child_of_kind(member, "statement_block") {
                        self.visit_statement(block, block, depth + 1)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn delete_member(&mut self, member: Node) {
        let mut start = member.start_byte();
        if let Some(comment) = leading_jsdoc(member, self.source()) {
            start = comment.start_byte();
        }
        let mut end = member.end_byte();
        if let Some(semi) = member.next_sibling().filter(|n| n.kind() == ";") {
            end = semi.end_byte();
        }
        if self.source()[end..].starts_with('\n') {
            end += 1;
        }
        self.rw.delete(start, end);
    }

    fn visit_field(&mut self, member: Node<'p>, depth: usize) -> Result<()> {
        if has_modifier(member, "declare") || has_modifier(member, "abstract") {
            self.delete_member(member);
            return Ok(());
        }
        let Some(value) = member.child_by_field_name("value") else {
            // Declaration-only field: the member-type-declaration carries
            // its annotation, nothing remains at runtime.
            self.delete_member(member);
            return Ok(());
        };

        // Re-serialize the property's own comment through the
        // escape-illegal-tags pass.
        let mut mjsdoc = self.mtt.get_mutable_jsdoc(member);
        mjsdoc.tags = escape_illegal_tags(std::mem::take(&mut mjsdoc.tags));
        mjsdoc.update_comment(&mut self.rw);

        self.erase_member_modifiers(member);
        self.visit_expression(value, depth + 1)
    }

    fn visit_constructor(&mut self, ctor: Node<'p>, depth: usize) -> Result<()> {
        let source = self.source();
        let param_props = members::parameter_properties(ctor);

        // Suppress doc comments on parameter properties so downstream
        // tooling does not read them as field annotations.
        if let Some(params) = ctor.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for child in params.children(&mut cursor) {
                if child.kind() == "comment" {
                    self.rw.delete(child.start_byte(), child.end_byte());
                }
            }
        }

        self.visit_function_like(ctor, ctor, depth)?;

        // Lower `constructor(public x)` into an explicit field assignment;
        // erasing the modifier alone would drop the implicit write.
        let Some(body) = ctor
            .child_by_field_name("body")
            .filter(|b| b.kind() == "statement_block")
        else {
            return Ok(());
        };
        if param_props.is_empty() {
            return Ok(());
        }
        let mut pos = body.start_byte() + 1;
        if let Some(first) = body.named_child(0) {
            let is_super_call = first.kind() == "expression_statement"
                && first
                    .named_child(0)
                    .filter(|e| e.kind() == "call_expression")
                    .and_then(|e| e.child_by_field_name("function"))
                    .is_some_and(|f| f.kind() == "super");
            if is_super_call {
                pos = first.end_byte();
            }
        }
        let inner_indent = format!("{}    ", line_indent(ctor, source));
        let mut text = String::new();
        for param in param_props {
            if let Some(name) = param
                .child_by_field_name("pattern")
                .filter(|p| p.kind() == "identifier")
            {
                let n = node_text(name, source);
                text.push_str(&format!("\n{inner_indent}this.{n} = {n};"));
            }
        }
        self.rw.insert(pos, text);
        Ok(())
    }

    fn visit_interface(&mut self, decl: Node<'p>, anchor: Node<'p>) -> Result<()> {
        let source = self.source();
        let Some(name_node) = decl.child_by_field_name("name") else {
            self.delete_statement(decl);
            return Ok(());
        };
        let symbol = self.mtt.checker.symbol_at_location(self.mtt.file, name_node);
        if symbol.is_some_and(|s| self.mtt.checker.symbol(s).is_value()) {
            self.mtt.debug_warn(
                decl,
                "interface name is also a value; skipping emit to avoid a collision",
            );
            self.delete_statement(anchor);
            return Ok(());
        }

        let name = node_text(name_node, source).to_string();
        let indent = line_indent(anchor, source);

        let mut mjsdoc = self.mtt.get_mutable_jsdoc(anchor);
        let mut tags = escape_illegal_tags(std::mem::take(&mut mjsdoc.tags));
        tags.push(Tag::marker("record"));
        tags.push(Tag::marker("struct"));
        self.template_tag(decl, &mut tags);
        tags.extend(members::heritage_tags(self.mtt, decl, true, false));
        mjsdoc.tags = tags;
        mjsdoc.update_comment(&mut self.rw);

        // The dialect has no interface form: a zero-argument function
        // carries the name, and the members live in the sibling block.
        let mut replacement = format!("function {name}() {{}}");
        if let Some(member_decl) =
            members::member_type_declaration(self.mtt, decl, &name, true, &indent)
        {
            replacement.push_str(&format!("\n{indent}{member_decl}"));
        }
        self.rw.replace(decl.start_byte(), decl.end_byte(), replacement);
        Ok(())
    }

    fn template_tag(&mut self, decl: Node<'p>, tags: &mut Vec<Tag>) {
        let names = self.mtt.type_parameter_names(decl);
        if names.is_empty() {
            return;
        }
        // Constraints are dropped: only unconstrained templates exist
        // downstream.
        let mut tag = Tag::marker("template");
        tag.text = Some(names.join(", "));
        tags.push(tag);
        self.mtt.blacklist_type_parameters(decl);
        if let Some(params) = crate::parser::type_parameters(decl) {
            self.rw.delete(params.start_byte(), params.end_byte());
        }
    }

    fn erase_heritage_syntax(&mut self, decl: Node<'p>) {
        let Some(heritage) = child_of_kind(decl, "class_heritage") else {
            return;
        };
        if let Some(implements) = child_of_kind(heritage, "implements_clause") {
            self.rw
                .delete(implements.start_byte(), implements.end_byte());
        }
        if let Some(extends) = child_of_kind(heritage, "extends_clause") {
            if let Some(args) = child_of_kind(extends, "type_arguments") {
                self.rw.delete(args.start_byte(), args.end_byte());
            }
        }
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn visit_function_like(
        &mut self,
        decl: Node<'p>,
        anchor: Node<'p>,
        depth: usize,
    ) -> Result<()> {
        let Some(body) = decl.child_by_field_name("body") else {
            // Overload signatures and abstract members are handled by the
            // member-type-declaration pass.
            return Ok(());
        };

        let mut mjsdoc = self.mtt.get_mutable_jsdoc(anchor);
        let extra = escape_illegal_tags(std::mem::take(&mut mjsdoc.tags));
        let (tags, _) = self.mtt.get_function_type_jsdoc(&[decl], extra);
        mjsdoc.tags = tags;
        mjsdoc.update_comment(&mut self.rw);

        self.erase_callable_syntax(decl, depth)?;
        if body.kind() == "statement_block" {
            self.visit_statement(body, body, depth + 1)
        } else {
            self.visit_expression(body, depth + 1)
        }
    }

    fn erase_callable_syntax(&mut self, decl: Node<'p>, depth: usize) -> Result<()> {
        if let Some(params) = crate::parser::type_parameters(decl) {
            self.rw.delete(params.start_byte(), params.end_byte());
        }
        if let Some(ret) = decl.child_by_field_name("return_type") {
            self.rw.delete(ret.start_byte(), ret.end_byte());
        }
        if let Some(list) = decl.child_by_field_name("parameters") {
            let mut cursor = list.walk();
            let params: Vec<Node> = list.named_children(&mut cursor).collect();
            for param in params {
                if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
                    continue;
                }
                if param
                    .child_by_field_name("pattern")
                    .is_some_and(|p| p.kind() == "this")
                {
                    // A `this` parameter is type-only; remove it and the
                    // following separator.
                    let end = param
                        .next_named_sibling()
                        .map(|next| next.start_byte())
                        .unwrap_or(param.end_byte());
                    self.rw.delete(param.start_byte(), end);
                    continue;
                }
                self.erase_member_modifiers(param);
                if let Some(value) = param.child_by_field_name("value") {
                    self.visit_expression(value, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    /// Delete the typed-dialect tokens a member or parameter may carry:
    /// visibility, readonly/override, optional and definite markers, and
    /// the type annotation itself.
    fn erase_member_modifiers(&mut self, node: Node<'p>) {
        let source = self.source();
        for kind in [
            "accessibility_modifier",
            "override_modifier",
            "readonly",
            "abstract",
        ] {
            if let Some(token) = token_child(node, kind) {
                self.rw
                    .delete_with_trailing_space(token.start_byte(), token.end_byte(), source);
            }
        }
        for kind in ["?", "!"] {
            if let Some(token) = token_child(node, kind) {
                self.rw.delete(token.start_byte(), token.end_byte());
            }
        }
        if let Some(ann) = node
            .child_by_field_name("type")
            .filter(|a| a.kind() == "type_annotation")
        {
            self.rw.delete(ann.start_byte(), ann.end_byte());
        }
    }

    // ========================================================================
    // Variables
    // ========================================================================

    fn visit_variable_statement(
        &mut self,
        stmt: Node<'p>,
        anchor: Node<'p>,
        depth: usize,
    ) -> Result<()> {
        let source = self.source();
        let declarators = children_of_kind(stmt, "variable_declarator");
        let keyword = stmt
            .child(0)
            .map(|k| node_text(k, source))
            .unwrap_or("let");

        // Inside a for-statement header there is no room for comments or
        // statement splitting; only the typed syntax is erased.
        let in_for_header = stmt
            .parent()
            .is_some_and(|p| matches!(p.kind(), "for_statement" | "for_in_statement"));
        if in_for_header {
            for declarator in &declarators {
                let _ = self.declarator_type_tag(*declarator, depth)?;
            }
            return Ok(());
        }

        if declarators.len() <= 1 {
            if let Some(declarator) = declarators.first() {
                let tag = self.declarator_type_tag(*declarator, depth)?;
                if let Some(tag) = tag {
                    let mut mjsdoc = self.mtt.get_mutable_jsdoc(anchor);
                    mjsdoc.tags = escape_illegal_tags(std::mem::take(&mut mjsdoc.tags));
                    mjsdoc.tags.push(tag);
                    mjsdoc.update_comment(&mut self.rw);
                }
            }
            return Ok(());
        }

        // One statement per declarator; the surrounding comment stays on
        // the first.
        let indent = line_indent(anchor, source);
        let exported = anchor.kind() == "export_statement";
        let mut pieces: Vec<String> = Vec::with_capacity(declarators.len());
        for (i, declarator) in declarators.iter().enumerate() {
            let tag = self.declarator_type_tag(*declarator, depth)?;
            let text = self
                .rw
                .apply_range(source, declarator.start_byte(), declarator.end_byte())?;
            let mut piece = String::new();
            if i == 0 {
                if let Some(tag) = tag {
                    let mut mjsdoc = self.mtt.get_mutable_jsdoc(anchor);
                    mjsdoc.tags = escape_illegal_tags(std::mem::take(&mut mjsdoc.tags));
                    mjsdoc.tags.push(tag);
                    mjsdoc.update_comment(&mut self.rw);
                }
            } else {
                if let Some(tag) = tag {
                    piece.push_str(&crate::jsdoc::serialize(&[tag], false));
                    piece.push('\n');
                    piece.push_str(&indent);
                }
                if exported {
                    piece.push_str("export ");
                }
            }
            piece.push_str(&format!("{keyword} {text};"));
            pieces.push(piece);
        }
        self.rw.replace(
            stmt.start_byte(),
            stmt.end_byte(),
            pieces.join(&format!("\n{indent}")),
        );
        Ok(())
    }

    /// Erase the declarator's typed syntax and compute its `@type` tag.
    /// Returns `None` for destructuring bindings (no annotation syntax
    /// exists for them) and for initialized declarators of blacklisted
    /// type, where downstream inference beats the `?` fallback.
    fn declarator_type_tag(
        &mut self,
        declarator: Node<'p>,
        depth: usize,
    ) -> Result<Option<Tag>> {
        self.erase_member_modifiers(declarator);
        let value = declarator.child_by_field_name("value");
        if let Some(value) = value {
            self.visit_expression(value, depth + 1)?;
        }
        let is_plain_identifier = declarator
            .child_by_field_name("name")
            .is_some_and(|n| n.kind() == "identifier");
        if !is_plain_identifier {
            return Ok(None);
        }
        let ty = self.mtt.checker.type_at_location(self.mtt.file, declarator);
        if value.is_some() && self.type_is_blacklisted(&ty, declarator) {
            return Ok(None);
        }
        let rendered = self.mtt.translate(&ty, declarator);
        Ok(Some(Tag::typed("type", rendered)))
    }

    fn type_is_blacklisted(&self, ty: &Type, context: Node<'p>) -> bool {
        match ty {
            Type::Reference { symbol, .. } => {
                self.mtt.new_type_translator(context).is_blacklisted(*symbol)
            }
            Type::Union(members) => members
                .iter()
                .any(|m| self.type_is_blacklisted(m, context)),
            _ => false,
        }
    }

    // ========================================================================
    // Type aliases and enums
    // ========================================================================

    fn visit_type_alias(&mut self, decl: Node<'p>, anchor: Node<'p>) -> Result<()> {
        let source = self.source();
        let Some(name_node) = decl.child_by_field_name("name") else {
            self.delete_statement(anchor);
            return Ok(());
        };
        let symbol = self.mtt.checker.symbol_at_location(self.mtt.file, name_node);
        if symbol.is_some_and(|s| self.mtt.checker.symbol(s).is_value()) {
            self.mtt.debug_warn(
                decl,
                "type alias name is also a value; skipping emit to avoid a collision",
            );
            self.delete_statement(anchor);
            return Ok(());
        }
        let exported = anchor.kind() == "export_statement";
        if !exported
            || self.mtt.host.module_format() != crate::types::ModuleFormat::TARGET
        {
            // Unexported aliases resolve inline downstream; other module
            // formats have no exports object to hang the typedef on.
            self.delete_statement(anchor);
            return Ok(());
        }

        self.mtt.blacklist_type_parameters(decl);
        let ty = decl
            .child_by_field_name("value")
            .map(|v| self.mtt.checker.type_at_location(self.mtt.file, v))
            .unwrap_or(Type::Unknown);
        let rendered = self.mtt.translate(&ty, decl);
        let name = node_text(name_node, source);
        self.rw.replace(
            anchor.start_byte(),
            anchor.end_byte(),
            format!("/** @typedef {{{rendered}}} */\nexports.{name};"),
        );
        Ok(())
    }

    fn visit_enum(&mut self, decl: Node<'p>, anchor: Node<'p>, depth: usize) -> Result<()> {
        let source = self.source();
        let Some(name_node) = decl.child_by_field_name("name") else {
            self.delete_statement(anchor);
            return Ok(());
        };
        let Some(body) = crate::parser::declaration_body(decl) else {
            self.delete_statement(anchor);
            return Ok(());
        };
        let name = node_text(name_node, source);

        let mut entries: Vec<String> = Vec::new();
        let mut next_value: Option<i64> = Some(0);
        let mut is_string = false;
        let mut cursor = body.walk();
        let member_nodes: Vec<Node> = body.named_children(&mut cursor).collect();
        for member in member_nodes {
            let (key_node, value_node) = match member.kind() {
                "enum_assignment" => (
                    member.child_by_field_name("name"),
                    member.child_by_field_name("value"),
                ),
                "property_identifier" | "string" => (Some(member), None),
                _ => continue,
            };
            let Some(key_node) = key_node else { continue };
            let key = node_text(key_node, source).to_string();
            let value = match value_node {
                Some(v) if v.kind() == "number" => {
                    let text = node_text(v, source).to_string();
                    next_value = text.parse::<i64>().ok().map(|n| n + 1);
                    text
                }
                Some(v) if v.kind() == "string" => {
                    is_string = true;
                    next_value = None;
                    node_text(v, source).to_string()
                }
                Some(v) => {
                    self.visit_expression(v, depth + 1)?;
                    next_value = None;
                    self.rw.apply_range(source, v.start_byte(), v.end_byte())?
                }
                None => match next_value {
                    Some(n) => {
                        next_value = Some(n + 1);
                        n.to_string()
                    }
                    None => {
                        self.mtt.error(
                            member,
                            "enum member requires an initializer after a non-constant member",
                        );
                        "0".to_string()
                    }
                },
            };
            entries.push(format!("{key}: {value}"));
        }

        let mut mjsdoc = self.mtt.get_mutable_jsdoc(anchor);
        mjsdoc.tags = escape_illegal_tags(std::mem::take(&mut mjsdoc.tags));
        mjsdoc.tags.push(Tag::typed(
            "enum",
            if is_string { "string" } else { "number" },
        ));
        mjsdoc.update_comment(&mut self.rw);

        self.rw.replace(
            decl.start_byte(),
            decl.end_byte(),
            format!("const {name} = {{{}}};", entries.join(", ")),
        );
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn visit_expression(&mut self, node: Node<'p>, depth: usize) -> Result<()> {
        if depth > MAX_VISIT_DEPTH {
            return Ok(());
        }
        match node.kind() {
            "as_expression" | "satisfies_expression" => self.visit_as_expression(node, depth),
            "type_assertion" => self.visit_type_assertion(node, depth),
            "non_null_expression" => self.visit_non_null(node, depth),
            "call_expression" | "new_expression" => {
                if let Some(args) = child_of_kind(node, "type_arguments") {
                    self.rw.delete(args.start_byte(), args.end_byte());
                }
                self.visit_children(node, depth)
            }
            "function_expression" | "arrow_function" | "generator_function" => {
                self.erase_callable_syntax(node, depth)?;
                match node.child_by_field_name("body") {
                    Some(body) if body.kind() == "statement_block" => {
                        self.visit_statement(body, body, depth + 1)
                    }
                    Some(body) => self.visit_expression(body, depth + 1),
                    None => Ok(()),
                }
            }
            "class" => self.erase_class_expression(node, depth),
            "member_expression" => self.visit_member_expression(node, depth),
            "statement_block" => self.visit_statement(node, node, depth + 1),
            "lexical_declaration" | "variable_declaration" => {
                // Reached through for-statement initializers.
                self.visit_variable_statement(node, node, depth)
            }
            _ => self.visit_children(node, depth),
        }
    }

    fn visit_children(&mut self, node: Node<'p>, depth: usize) -> Result<()> {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                k if is_statement_kind(k) => self.visit_statement(child, child, depth + 1)?,
                _ => self.visit_expression(child, depth + 1)?,
            }
        }
        Ok(())
    }

    /// Rewrite an expression into a parenthesized cast:
    /// `(/** @type {T} */ (expr))`, with no trailing newline inside the
    /// comment.
    fn emit_cast(
        &mut self,
        node: Node<'p>,
        inner: Node<'p>,
        type_str: &str,
        depth: usize,
    ) -> Result<()> {
        self.visit_expression(inner, depth + 1)?;
        let inner_text = self
            .rw
            .apply_range(self.source(), inner.start_byte(), inner.end_byte())?;
        self.rw.replace(
            node.start_byte(),
            node.end_byte(),
            format!("(/** @type {{{type_str}}} */ ({inner_text}))"),
        );
        Ok(())
    }

    fn visit_as_expression(&mut self, node: Node<'p>, depth: usize) -> Result<()> {
        let Some(inner) = node.named_child(0) else {
            return Ok(());
        };
        let count = node.named_child_count();
        let target = (count > 1).then(|| node.named_child(count - 1)).flatten();
        if node.kind() == "as_expression" {
            if let Some(target) = target.filter(|t| is_type_kind(t.kind())) {
                let ty = self.mtt.checker.type_at_location(self.mtt.file, target);
                let rendered = self.mtt.translate(&ty, node);
                return self.emit_cast(node, inner, &rendered, depth);
            }
        }
        // `as const` / `satisfies`: type-level only, unwrap to the operand.
        self.visit_expression(inner, depth + 1)?;
        let inner_text = self
            .rw
            .apply_range(self.source(), inner.start_byte(), inner.end_byte())?;
        self.rw
            .replace(node.start_byte(), node.end_byte(), inner_text);
        Ok(())
    }

    fn visit_type_assertion(&mut self, node: Node<'p>, depth: usize) -> Result<()> {
        let count = node.named_child_count();
        let Some(inner) = (count > 0).then(|| node.named_child(count - 1)).flatten() else {
            return Ok(());
        };
        let type_node = node
            .named_child(0)
            .map(|t| {
                if t.kind() == "type_arguments" {
                    t.named_child(0).unwrap_or(t)
                } else {
                    t
                }
            })
            .filter(|t| is_type_kind(t.kind()));
        let rendered = match type_node {
            Some(t) => {
                let ty = self.mtt.checker.type_at_location(self.mtt.file, t);
                self.mtt.translate(&ty, node)
            }
            None => "?".to_string(),
        };
        self.emit_cast(node, inner, &rendered, depth)
    }

    fn visit_non_null(&mut self, node: Node<'p>, depth: usize) -> Result<()> {
        let Some(inner) = node.named_child(0) else {
            return Ok(());
        };
        let ty = self.mtt.checker.type_at_location(self.mtt.file, inner);
        let non_null = self.mtt.checker.non_nullable_type(&ty);
        let rendered = self.mtt.translate(&non_null, node);
        self.emit_cast(node, inner, &rendered, depth)
    }

    fn visit_member_expression(&mut self, node: Node<'p>, depth: usize) -> Result<()> {
        let object = node.child_by_field_name("object");
        let property = node.child_by_field_name("property");
        if let (Some(object), Some(property)) = (object, property) {
            if !self.mtt.host.disable_auto_quoting() && property.kind() == "property_identifier" {
                let ty = self.mtt.checker.type_at_location(self.mtt.file, object);
                if matches!(ty, Type::IndexMap { .. }) {
                    // Index-signature types are accessed by quoted key so
                    // renaming passes leave them alone.
                    let prop = node_text(property, self.source());
                    self.rw.replace(
                        object.end_byte(),
                        node.end_byte(),
                        format!("['{prop}']"),
                    );
                }
            }
            self.visit_expression(object, depth + 1)?;
        }
        Ok(())
    }

    fn erase_class_expression(&mut self, node: Node<'p>, depth: usize) -> Result<()> {
        if let Some(params) = crate::parser::type_parameters(node) {
            self.rw.delete(params.start_byte(), params.end_byte());
        }
        self.erase_heritage_syntax(node);
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            let member_nodes: Vec<Node> = body.named_children(&mut cursor).collect();
            for member in member_nodes {
                match member.kind() {
                    "method_definition" => {
                        self.erase_callable_syntax(member, depth)?;
                        if let Some(b) = member.child_by_field_name("body") {
                            self.visit_statement(b, b, depth + 1)?;
                        }
                    }
                    "method_signature" | "abstract_method_signature" | "index_signature" => {
                        self.delete_member(member)
                    }
                    "public_field_definition" => {
                        self.erase_member_modifiers(member);
                        match member.child_by_field_name("value") {
                            Some(value) => self.visit_expression(value, depth + 1)?,
                            None => self.delete_member(member),
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

/// Statement-shaped node kinds routed through the statement dispatcher
/// when encountered during generic recursion.
fn is_statement_kind(kind: &str) -> bool {
    matches!(
        kind,
        "lexical_declaration"
            | "variable_declaration"
            | "function_declaration"
            | "generator_function_declaration"
            | "function_signature"
            | "class_declaration"
            | "abstract_class_declaration"
            | "interface_declaration"
            | "type_alias_declaration"
            | "enum_declaration"
            | "ambient_declaration"
            | "internal_module"
            | "module"
            | "statement_block"
            | "export_statement"
            | "import_statement"
    )
}
