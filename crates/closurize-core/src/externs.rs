//! Externs Generator
//!
//! ARCHITECTURE: A printer over declaration-only statements. Walks the
//! ambient syntax with an accumulated namespace path and appends flat,
//! namespaced stubs to a string: constructor functions for class-likes,
//! `@type` lines for properties and variables, merged functions for
//! overload groups, and TODO comments for everything it cannot express.

use tree_sitter::Node;

use crate::annotator::members::heritage_tags;
use crate::checker::Checker;
use crate::jsdoc::{self, Tag};
use crate::parser::{child_of_kind, children_of_kind, has_modifier, node_text, token_child};
use crate::translator::ModuleTypeTranslator;

/// Root object housing declared external modules (`declare module "x"`).
const DECLARE_MODULE_ROOT: &str = "tsickle_declare_module";

/// Global names that must never be re-declared in externs output.
const BLACKLISTED_NAMES: &[&str] = &[
    "exports",
    "global",
    "module",
    "ErrorConstructor",
    "Symbol",
    "WorkerGlobalScope",
];

/// Import-equals local names that are skipped outright.
const BLACKLISTED_IMPORT_ALIASES: &[&str] = &["ng"];

/// Generate the externs stub text for one file's ambient statements.
///
/// For a declaration file every statement participates; for an
/// implementation file only `declare`d statements do.
pub(crate) fn generate_externs_content<'p>(
    mtt: &ModuleTypeTranslator<'p>,
    root: Node<'p>,
    is_declaration_file: bool,
) -> String {
    let mut writer = ExternsWriter {
        mtt,
        out: String::new(),
        declare_module_root_emitted: false,
    };
    let mut cursor = root.walk();
    let children: Vec<Node> = root.named_children(&mut cursor).collect();
    for child in children {
        if !is_declaration_file && child.kind() != "ambient_declaration" {
            continue;
        }
        writer.visit_statement(&[], child);
    }
    writer.out
}

struct ExternsWriter<'a, 'p> {
    mtt: &'a ModuleTypeTranslator<'p>,
    out: String,
    declare_module_root_emitted: bool,
}

impl<'a, 'p> ExternsWriter<'a, 'p> {
    fn source(&self) -> &'p str {
        self.mtt.source
    }

    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn comment(&mut self, tags: &[Tag]) {
        let text = jsdoc::serialize(tags, false);
        if !text.is_empty() {
            self.line(&text);
        }
    }

    fn todo(&mut self, what: &str) {
        self.line(&format!(
            "/* TODO: {} */",
            jsdoc::escape_comment_text(what)
        ));
    }

    fn qualify(&self, ns: &[String], name: &str) -> String {
        if ns.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", ns.join("."), name)
        }
    }

    // ========================================================================
    // Statement dispatch
    // ========================================================================

    fn visit_statement(&mut self, ns: &[String], stmt: Node<'p>) {
        match stmt.kind() {
            "ambient_declaration" => {
                let mut cursor = stmt.walk();
                let inner: Vec<Node> = stmt.named_children(&mut cursor).collect();
                for node in inner {
                    if node.kind() == "statement_block" {
                        // `declare global { ... }` re-roots the namespace.
                        let mut block_cursor = node.walk();
                        let stmts: Vec<Node> = node.named_children(&mut block_cursor).collect();
                        for s in stmts {
                            self.visit_statement(&[], s);
                        }
                    } else {
                        self.visit_statement(ns, node);
                    }
                }
            }
            "export_statement" => {
                if let Some(decl) = stmt.child_by_field_name("declaration") {
                    self.visit_statement(ns, decl);
                }
            }
            "internal_module" | "module" => self.visit_module(ns, stmt),
            "class_declaration" | "abstract_class_declaration" => {
                self.visit_class_like(ns, stmt, false);
            }
            "interface_declaration" => self.visit_class_like(ns, stmt, true),
            "function_declaration" | "function_signature" => self.visit_function(ns, stmt),
            "lexical_declaration" | "variable_declaration" => self.visit_variables(ns, stmt),
            "enum_declaration" => self.visit_enum(ns, stmt),
            "type_alias_declaration" => self.visit_type_alias(ns, stmt),
            "import_statement" => {
                if child_of_kind(stmt, "import_require_clause").is_some() {
                    self.todo("import-equals with external module reference");
                }
                // Plain imports carry no externs content.
            }
            "import_alias" => self.visit_import_alias(ns, stmt),
            "comment" | "empty_statement" => {}
            other => self.todo(&format!("unhandled statement kind: {other}")),
        }
    }

    // ========================================================================
    // Modules and namespaces
    // ========================================================================

    fn visit_module(&mut self, ns: &[String], stmt: Node<'p>) {
        let Some(name_node) = stmt.child_by_field_name("name") else {
            self.mtt.error(stmt, "declared module without a name");
            return;
        };
        let body = crate::parser::declaration_body(stmt);

        if name_node.kind() == "string" {
            // Declared external module: mangled child object under the
            // shared root.
            let module_name = crate::checker::binder::string_value(name_node, self.source());
            let mangled = mangle_module_name(&module_name);
            if !self.declare_module_root_emitted {
                self.comment(&[Tag::marker("const")]);
                self.line(&format!("var {DECLARE_MODULE_ROOT} = {{}};"));
                self.declare_module_root_emitted = true;
            }
            self.comment(&[Tag::marker("const")]);
            self.line(&format!("{DECLARE_MODULE_ROOT}.{mangled} = {{}};"));
            if let Some(body) = body {
                let inner_ns = vec![DECLARE_MODULE_ROOT.to_string(), mangled];
                self.visit_module_body(&inner_ns, body);
            }
            return;
        }

        let name = node_text(name_node, self.source()).to_string();
        if name == "global" {
            if let Some(body) = body {
                self.visit_module_body(&[], body);
            }
            return;
        }

        // Only the first declaration of a namespace initializes the
        // object; re-opened namespaces just contribute members.
        let is_first = self
            .mtt
            .checker
            .symbol_at_location(self.mtt.file, name_node)
            .and_then(|s| self.mtt.checker.symbol(s).first_decl)
            .map(|site| site.node_id == stmt.id())
            .unwrap_or(true);

        let mut inner_ns = ns.to_vec();
        for (i, segment) in name.split('.').enumerate() {
            if is_first || i > 0 {
                self.comment(&[Tag::marker("const")]);
                let qualified = self.qualify(&inner_ns, segment);
                if inner_ns.is_empty() {
                    self.line(&format!("var {segment} = {{}};"));
                } else {
                    self.line(&format!("{qualified} = {{}};"));
                }
            }
            inner_ns.push(segment.to_string());
        }
        if let Some(body) = body {
            self.visit_module_body(&inner_ns, body);
        }
    }

    fn visit_module_body(&mut self, ns: &[String], body: Node<'p>) {
        let mut cursor = body.walk();
        let stmts: Vec<Node> = body.named_children(&mut cursor).collect();
        for stmt in stmts {
            self.visit_statement(ns, stmt);
        }
    }

    fn visit_import_alias(&mut self, ns: &[String], stmt: Node<'p>) {
        let source = self.source();
        let Some(local) = child_of_kind(stmt, "identifier") else {
            self.todo("import-equals without a local name");
            return;
        };
        let local_name = node_text(local, source);
        if BLACKLISTED_IMPORT_ALIASES.contains(&local_name) {
            self.line(&format!("/* skipping import alias: {local_name} */"));
            return;
        }
        if child_of_kind(stmt, "import_require_clause").is_some() {
            self.todo("import-equals with external module reference");
            return;
        }
        let rhs = child_of_kind(stmt, "nested_identifier")
            .map(|n| node_text(n, source).to_string())
            .or_else(|| {
                children_of_kind(stmt, "identifier")
                    .get(1)
                    .map(|n| node_text(*n, source).to_string())
            });
        let Some(rhs) = rhs else {
            self.todo("import-equals with an unsupported right-hand side");
            return;
        };
        self.comment(&[Tag::marker("const")]);
        if ns.is_empty() {
            self.line(&format!("var {local_name} = {rhs};"));
        } else {
            self.line(&format!("{} = {rhs};", self.qualify(ns, local_name)));
        }
    }

    // ========================================================================
    // Class-likes
    // ========================================================================

    fn visit_class_like(&mut self, ns: &[String], decl: Node<'p>, is_interface: bool) {
        let source = self.source();
        let Some(name_node) = decl.child_by_field_name("name") else {
            self.mtt.error(decl, "anonymous declaration in externs");
            return;
        };
        let name = node_text(name_node, source);
        if BLACKLISTED_NAMES.contains(&name) {
            return;
        }
        let qualified = self.qualify(ns, name);
        let Some(body) = crate::parser::declaration_body(decl) else {
            return;
        };

        self.mtt.blacklist_type_parameters(decl);

        // Declaration merging: only the first declaration of this name
        // writes the constructor stub; later ones add members only.
        let is_first = self
            .mtt
            .checker
            .symbol_at_location(self.mtt.file, name_node)
            .and_then(|s| self.mtt.checker.symbol(s).first_decl)
            .map(|site| site.node_id == decl.id())
            .unwrap_or(true);

        let mut cursor = body.walk();
        let members: Vec<Node> = body.named_children(&mut cursor).collect();

        if is_first {
            let mut tags = if is_interface {
                vec![Tag::marker("record"), Tag::marker("struct")]
            } else {
                vec![Tag::marker("constructor"), Tag::marker("struct")]
            };
            tags.extend(heritage_tags(self.mtt, decl, is_interface, true));

            let constructors: Vec<Node> = members
                .iter()
                .copied()
                .filter(|m| {
                    matches!(m.kind(), "method_definition" | "method_signature")
                        && m.child_by_field_name("name")
                            .is_some_and(|n| node_text(n, source) == "constructor")
                })
                .collect();
            let (tags, parameter_names) = self.mtt.get_function_type_jsdoc(&constructors, tags);

            self.comment(&tags);
            let params = parameter_names.join(", ");
            if ns.is_empty() {
                self.line(&format!("function {name}({params}) {{}}"));
            } else {
                self.line(&format!("{qualified} = function({params}) {{}};"));
            }
        }

        self.visit_class_members(&qualified, &members);
    }

    fn visit_class_members(&mut self, qualified: &str, members: &[Node<'p>]) {
        let source = self.source();

        // Overloaded methods merge into one stub per (name, static) group.
        let mut emitted_methods: Vec<(String, bool)> = Vec::new();

        for member in members {
            match member.kind() {
                "property_signature" | "public_field_definition" => {
                    self.visit_property(qualified, *member);
                }
                "method_signature" | "method_definition" | "abstract_method_signature" => {
                    let Some(name_node) = member.child_by_field_name("name") else {
                        self.todo("method with no name");
                        continue;
                    };
                    let method_name = node_text(name_node, source).to_string();
                    if method_name == "constructor" {
                        continue;
                    }
                    let is_static = has_modifier(*member, "static");
                    let group_key = (method_name.clone(), is_static);
                    if emitted_methods.contains(&group_key) {
                        continue;
                    }
                    emitted_methods.push(group_key);

                    let group: Vec<Node> = members
                        .iter()
                        .copied()
                        .filter(|m| {
                            matches!(
                                m.kind(),
                                "method_signature" | "method_definition" | "abstract_method_signature"
                            ) && m
                                .child_by_field_name("name")
                                .is_some_and(|n| node_text(n, source) == method_name)
                                && has_modifier(*m, "static") == is_static
                        })
                        .collect();
                    let (tags, parameter_names) = self.mtt.get_function_type_jsdoc(&group, vec![]);
                    self.comment(&tags);
                    let target = if is_static {
                        format!("{qualified}.{method_name}")
                    } else {
                        format!("{qualified}.prototype.{method_name}")
                    };
                    self.line(&format!(
                        "{target} = function({}) {{}};",
                        parameter_names.join(", ")
                    ));
                }
                "comment" => {}
                other => self.todo(&format!(
                    "unhandled member kind {other}: {}",
                    node_text(*member, source)
                )),
            }
        }
    }

    fn visit_property(&mut self, qualified: &str, member: Node<'p>) {
        let source = self.source();
        let Some(name_node) = member.child_by_field_name("name") else {
            self.todo("property with no name");
            return;
        };
        if name_node.kind() == "computed_property_name" {
            self.todo(&format!(
                "computed property name: {}",
                node_text(member, source)
            ));
            return;
        }
        let is_static = has_modifier(member, "static");
        let optional = token_child(member, "?").is_some();

        let ty = self.mtt.checker.type_at_location(self.mtt.file, member);
        let mut rendered = self.mtt.translate(&ty, member);
        if optional {
            rendered = if rendered == "?" {
                "?|undefined".to_string()
            } else {
                format!("({rendered}|undefined)")
            };
        }
        self.comment(&[Tag::typed("type", rendered)]);
        let target = if is_static {
            format!("{qualified}.{}", node_text(name_node, source))
        } else {
            format!("{qualified}.prototype.{}", node_text(name_node, source))
        };
        self.line(&format!("{target};"));
    }

    // ========================================================================
    // Functions, variables, enums, aliases
    // ========================================================================

    fn visit_function(&mut self, ns: &[String], decl: Node<'p>) {
        let source = self.source();
        let Some(name_node) = decl.child_by_field_name("name") else {
            self.mtt.error(decl, "anonymous function in externs");
            return;
        };
        let name = node_text(name_node, source).to_string();

        // All overloads at this level merge into one emitted stub, written
        // when the first overload is visited.
        let overloads = self.sibling_overloads(decl, &name);
        if overloads.first().map(|n| n.id()) != Some(decl.id()) {
            return;
        }
        let (tags, parameter_names) = self.mtt.get_function_type_jsdoc(&overloads, vec![]);
        self.comment(&tags);
        let params = parameter_names.join(", ");
        if ns.is_empty() {
            self.line(&format!("function {name}({params}) {{}}"));
        } else {
            self.line(&format!(
                "{} = function({params}) {{}};",
                self.qualify(ns, &name)
            ));
        }
    }

    /// Function declarations sharing a name in the same statement list,
    /// looking through `declare`/`export` wrappers.
    fn sibling_overloads(&self, decl: Node<'p>, name: &str) -> Vec<Node<'p>> {
        let source = self.source();
        let mut container = decl;
        while let Some(parent) = container.parent() {
            container = parent;
            if matches!(container.kind(), "program" | "statement_block") {
                break;
            }
        }
        let mut cursor = container.walk();
        container
            .named_children(&mut cursor)
            .filter_map(|mut stmt| {
                loop {
                    match stmt.kind() {
                        "ambient_declaration" | "export_statement" => {
                            stmt = stmt.named_child(0)?;
                        }
                        "function_declaration" | "function_signature" => return Some(stmt),
                        _ => return None,
                    }
                }
            })
            .filter(|f| {
                f.child_by_field_name("name")
                    .is_some_and(|n| node_text(n, source) == name)
            })
            .collect()
    }

    fn visit_variables(&mut self, ns: &[String], stmt: Node<'p>) {
        let source = self.source();
        for declarator in children_of_kind(stmt, "variable_declarator") {
            let Some(name_node) = declarator
                .child_by_field_name("name")
                .filter(|n| n.kind() == "identifier")
            else {
                self.todo("destructuring declaration in externs");
                continue;
            };
            let name = node_text(name_node, source);
            if BLACKLISTED_NAMES.contains(&name) {
                continue;
            }
            let ty = self.mtt.checker.type_at_location(self.mtt.file, declarator);
            let rendered = self.mtt.translate(&ty, declarator);
            self.comment(&[Tag::typed("type", rendered)]);
            if ns.is_empty() {
                self.line(&format!("var {name};"));
            } else {
                self.line(&format!("{};", self.qualify(ns, name)));
            }
        }
    }

    fn visit_enum(&mut self, ns: &[String], decl: Node<'p>) {
        let source = self.source();
        let Some(name_node) = decl.child_by_field_name("name") else {
            self.mtt.error(decl, "anonymous enum in externs");
            return;
        };
        let name = node_text(name_node, source);
        let qualified = self.qualify(ns, name);

        self.comment(&[Tag::marker("const")]);
        if ns.is_empty() {
            self.line(&format!("var {name} = {{}};"));
        } else {
            self.line(&format!("{qualified} = {{}};"));
        }

        let Some(body) = crate::parser::declaration_body(decl) else {
            return;
        };
        let mut cursor = body.walk();
        let members: Vec<Node> = body.named_children(&mut cursor).collect();
        for member in members {
            let key_node = match member.kind() {
                "enum_assignment" => member.child_by_field_name("name"),
                "property_identifier" | "string" => Some(member),
                _ => None,
            };
            let Some(key_node) = key_node else { continue };
            let raw = node_text(key_node, source);
            let key = raw.trim_matches(['\'', '"']);
            if !is_valid_identifier(key) {
                self.todo(&format!("enum member with unrepresentable name: {raw}"));
                continue;
            }
            self.comment(&[Tag::typed("const", "number")]);
            self.line(&format!("{qualified}.{key};"));
        }
    }

    fn visit_type_alias(&mut self, ns: &[String], decl: Node<'p>) {
        let source = self.source();
        let Some(name_node) = decl.child_by_field_name("name") else {
            return;
        };
        self.mtt.blacklist_type_parameters(decl);
        let rendered = decl
            .child_by_field_name("value")
            .map(|v| {
                let ty = self.mtt.checker.type_at_location(self.mtt.file, v);
                self.mtt.translate(&ty, decl)
            })
            .unwrap_or_else(|| "?".to_string());
        self.comment(&[Tag::typed("typedef", rendered)]);
        let name = node_text(name_node, source);
        if ns.is_empty() {
            self.line(&format!("var {name};"));
        } else {
            self.line(&format!("{};", self.qualify(ns, name)));
        }
    }
}

/// Mangle a declared module name to a safe identifier: double existing
/// underscores, then map every other non-alphanumeric character to one.
fn mangle_module_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '_' {
            out.push_str("__");
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mangle_module_name() {
        assert_eq!(mangle_module_name("foo-bar/baz"), "foo_bar_baz");
        assert_eq!(mangle_module_name("has_underscore"), "has__underscore");
        assert_eq!(mangle_module_name("plain"), "plain");
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("foo"));
        assert!(is_valid_identifier("_bar$2"));
        assert!(!is_valid_identifier("2start"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier(""));
    }
}
