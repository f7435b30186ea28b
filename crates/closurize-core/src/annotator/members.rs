//! Class and interface member handling
//!
//! Heritage-clause translation and the dead-code member-type-declaration
//! block (`if (false) { ... }`) that lists every member of a class-like
//! with its annotation, without ever executing at runtime.

use tree_sitter::Node;

use crate::checker::ty::Type;
use crate::checker::{Checker, SymbolFlags, SymbolId};
use crate::jsdoc::{self, Tag};
use crate::parser::{child_of_kind, has_modifier, node_text, token_child};
use crate::translator::ModuleTypeTranslator;

/// Resolve a heritage expression's symbol through import aliases and type
/// aliases to the ultimate named type.
fn resolve_heritage_symbol(mtt: &ModuleTypeTranslator<'_>, mut symbol: SymbolId) -> Option<SymbolId> {
    // Bounded: alias chains in merged declarations can in principle loop.
    for _ in 0..16 {
        let resolved = mtt.checker.aliased_symbol(symbol);
        let sym = mtt.checker.symbol(resolved);
        if sym.is_type_alias() {
            match mtt.checker.declared_type_of_symbol(resolved) {
                Type::Reference { symbol: target, .. } if target != resolved => symbol = target,
                _ => return None,
            }
        } else if resolved != symbol {
            symbol = resolved;
        } else {
            return Some(resolved);
        }
    }
    None
}

/// Translate the heritage clauses of a class or interface into tags.
///
/// `is_ambient` selects the externs behavior where even a runtime
/// `extends` needs a tag because the output uses the class-emulation form.
pub(crate) fn heritage_tags<'p>(
    mtt: &ModuleTypeTranslator<'p>,
    decl: Node<'p>,
    is_interface: bool,
    is_ambient: bool,
) -> Vec<Tag> {
    let mut tags = Vec::new();

    let mut clauses: Vec<(bool, Node)> = Vec::new(); // (is_extends_token, clause)
    if is_interface {
        for kind in ["extends_type_clause", "extends_clause"] {
            if let Some(clause) = child_of_kind(decl, kind) {
                clauses.push((true, clause));
            }
        }
    } else if let Some(heritage) = child_of_kind(decl, "class_heritage") {
        if let Some(clause) = child_of_kind(heritage, "extends_clause") {
            clauses.push((true, clause));
        }
        if let Some(clause) = child_of_kind(heritage, "implements_clause") {
            clauses.push((false, clause));
        }
    }

    let has_runtime_extends = !is_interface
        && child_of_kind(decl, "class_heritage")
            .and_then(|h| child_of_kind(h, "extends_clause"))
            .is_some();

    for (is_extends_token, clause) in clauses {
        let mut cursor = clause.walk();
        let entries: Vec<Node> = clause
            .named_children(&mut cursor)
            .filter(|c| !matches!(c.kind(), "type_arguments" | "comment"))
            .collect();
        for entry in entries {
            // `extends Foo<T>` arrives as a name plus sibling
            // type_arguments; `implements Foo<T>` as a generic_type.
            let name_node = match entry.kind() {
                "generic_type" => entry
                    .child_by_field_name("name")
                    .or_else(|| child_of_kind(entry, "type_identifier"))
                    .unwrap_or(entry),
                _ => entry,
            };

            let Some(symbol) = mtt.checker.symbol_at_location(mtt.file, name_node) else {
                tags.push(Tag::text(
                    "could not resolve supertype, class definition may be incomplete",
                ));
                continue;
            };
            let Some(resolved) = resolve_heritage_symbol(mtt, symbol) else {
                tags.push(Tag::text(
                    "could not resolve supertype, class definition may be incomplete",
                ));
                continue;
            };

            let translator = mtt.new_type_translator(decl);
            if translator.is_blacklisted(resolved) {
                continue;
            }
            let sym = mtt.checker.symbol(resolved);

            let tag_name = if is_interface {
                "extends"
            } else if sym.is_class() {
                // Treating a class-typed `implements` as `extends` is
                // deliberate: the downstream consumer has one inheritance
                // slot. Skip when a real extends already fills it.
                if !is_extends_token && has_runtime_extends {
                    continue;
                }
                "extends"
            } else if sym.is_interface() {
                "implements"
            } else if sym.flags.contains(SymbolFlags::VALUE) && !sym.is_type() {
                // The name does not exist in the type namespace.
                continue;
            } else {
                "implements"
            };

            // A non-ambient runtime extends is preserved syntactically and
            // needs no tag.
            if is_extends_token && !is_interface && !is_ambient {
                continue;
            }

            let type_args: Vec<Type> = heritage_type_args(mtt, entry);
            let rendered = translator.translate(&Type::Reference {
                symbol: resolved,
                type_args,
            });
            tags.push(Tag::typed(tag_name, rendered));
        }
    }
    tags
}

fn heritage_type_args<'p>(mtt: &ModuleTypeTranslator<'p>, entry: Node<'p>) -> Vec<Type> {
    let args = match entry.kind() {
        "generic_type" => entry
            .child_by_field_name("type_arguments")
            .or_else(|| child_of_kind(entry, "type_arguments")),
        _ => entry
            .next_named_sibling()
            .filter(|s| s.kind() == "type_arguments"),
    };
    let Some(args) = args else {
        return Vec::new();
    };
    let mut cursor = args.walk();
    args.named_children(&mut cursor)
        .map(|a| mtt.checker.type_at_location(mtt.file, a))
        .collect()
}

/// The constructor parameters that double as field declarations.
pub(crate) fn parameter_properties<'t>(ctor: Node<'t>) -> Vec<Node<'t>> {
    let Some(params) = ctor.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut cursor = params.walk();
    params
        .named_children(&mut cursor)
        .filter(|p| matches!(p.kind(), "required_parameter" | "optional_parameter"))
        .filter(|p| {
            has_modifier(*p, "accessibility_modifier")
                || has_modifier(*p, "readonly")
                || has_modifier(*p, "override_modifier")
        })
        .collect()
}

/// First constructor of a class body, if any. When ambient code declares
/// several, only the first feeds the member-type-declaration; the others
/// are merged by the externs path.
pub(crate) fn first_constructor<'t>(body: Node<'t>, source: &str) -> Option<Node<'t>> {
    let mut cursor = body.walk();
    let found = body.named_children(&mut cursor).find(|m| {
        m.kind() == "method_definition"
            && m.child_by_field_name("name")
                .is_some_and(|n| node_text(n, source) == "constructor")
    });
    found
}

/// Build the `if (false) { ... }` member-type-declaration for a class or
/// interface, or `None` when there is nothing to declare.
pub(crate) fn member_type_declaration<'p>(
    mtt: &ModuleTypeTranslator<'p>,
    decl: Node<'p>,
    type_name: &str,
    is_interface: bool,
    indent: &str,
) -> Option<String> {
    if type_name.is_empty() {
        return None;
    }
    let body = crate::parser::declaration_body(decl)?;
    let inner_indent = format!("{indent}    ");
    let mut lines: Vec<String> = Vec::new();

    let mut cursor = body.walk();
    let members: Vec<Node> = body.named_children(&mut cursor).collect();
    for member in &members {
        match member.kind() {
            "public_field_definition" | "property_signature" => {
                property_lines(mtt, *member, type_name, &inner_indent, &mut lines);
            }
            "abstract_method_signature" if !is_interface => {
                method_lines(mtt, *member, type_name, true, &inner_indent, &mut lines);
            }
            "method_signature" if is_interface => {
                method_lines(mtt, *member, type_name, false, &inner_indent, &mut lines);
            }
            "method_definition" | "method_signature" | "comment" | "decorator" => {}
            other => {
                let escaped = jsdoc::escape_comment_text(node_text(*member, mtt.source));
                lines.push(format!(
                    "{inner_indent}/* TODO: unhandled member kind {other}:\n{inner_indent}   {escaped}\n{inner_indent}*/"
                ));
            }
        }
    }

    // Parameter properties of the first constructor surface as instance
    // fields.
    if !is_interface {
        if let Some(ctor) = first_constructor(body, mtt.source) {
            for param in parameter_properties(ctor) {
                let Some(name) = param
                    .child_by_field_name("pattern")
                    .filter(|p| p.kind() == "identifier")
                else {
                    continue;
                };
                let ty = mtt.checker.type_at_location(mtt.file, param);
                let rendered = mtt.translate(&ty, decl);
                lines.push(format!("{inner_indent}/** @type {{{rendered}}} */"));
                lines.push(format!(
                    "{inner_indent}{type_name}.prototype.{};",
                    node_text(name, mtt.source)
                ));
            }
        }
    }

    if lines.is_empty() {
        return None;
    }
    Some(format!(
        "if (false) {{\n{}\n{indent}}}",
        lines.join("\n")
    ))
}

fn property_lines<'p>(
    mtt: &ModuleTypeTranslator<'p>,
    member: Node<'p>,
    type_name: &str,
    indent: &str,
    lines: &mut Vec<String>,
) {
    let Some(name) = member.child_by_field_name("name") else {
        mtt.error(member, "property with no name");
        return;
    };
    if name.kind() == "computed_property_name" {
        let escaped = jsdoc::escape_comment_text(node_text(member, mtt.source));
        lines.push(format!("{indent}/* TODO: computed property: {escaped} */"));
        return;
    }
    let is_static = has_modifier(member, "static");
    let optional = token_child(member, "?").is_some();

    let ty = mtt.checker.type_at_location(mtt.file, member);
    let mut rendered = mtt.translate(&ty, member);
    if optional {
        // An optional property of unknown type still admits undefined.
        rendered = if rendered == "?" {
            "?|undefined".to_string()
        } else {
            format!("({rendered}|undefined)")
        };
    }

    let mut tags = Vec::new();
    if child_of_kind(member, "decorator").is_some() {
        tags.push(Tag::marker("export"));
    }
    tags.push(Tag::typed("type", rendered));
    let comment = indent_block(&jsdoc::serialize(&tags, false), indent);

    let target = if is_static {
        format!("{type_name}.{}", node_text(name, mtt.source))
    } else {
        format!("{type_name}.prototype.{}", node_text(name, mtt.source))
    };
    lines.push(format!("{indent}{comment}"));
    lines.push(format!("{indent}{target};"));
}

fn method_lines<'p>(
    mtt: &ModuleTypeTranslator<'p>,
    member: Node<'p>,
    type_name: &str,
    is_abstract: bool,
    indent: &str,
    lines: &mut Vec<String>,
) {
    let Some(name) = member.child_by_field_name("name") else {
        mtt.error(member, "method with no name");
        return;
    };
    let extra = if is_abstract {
        vec![Tag::marker("abstract")]
    } else {
        Vec::new()
    };
    let (tags, parameter_names) = mtt.get_function_type_jsdoc(&[member], extra);
    let comment = indent_block(&jsdoc::serialize(&tags, false), indent);
    lines.push(format!("{indent}{comment}"));
    lines.push(format!(
        "{indent}{type_name}.prototype.{} = function({}) {{}};",
        node_text(name, mtt.source),
        parameter_names.join(", ")
    ));
}

/// Re-indent the continuation lines of a serialized block comment.
fn indent_block(comment: &str, indent: &str) -> String {
    comment.replace('\n', &format!("\n{indent}"))
}
