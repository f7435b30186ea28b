//! Module Type Translator
//!
//! ARCHITECTURE: Per-source-file facade over the type-string translator.
//! Owns every piece of mutable per-file state (symbol aliases, forward
//! declares, diagnostics) and hands short-lived borrows of itself to the
//! visitors. Discarded once the file's output is assembled.

pub mod type_string;

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;
use tree_sitter::Node;

use crate::checker::ty::Type;
use crate::checker::{Checker, FileId, SymbolId};
use crate::jsdoc::{self, Tag};
use crate::parser::{children_of_kind, leading_jsdoc, line_indent, node_text, type_parameters};
use crate::rewrite::Rewriter;
use crate::types::{Category, Diagnostic, TranslatorHost};
use type_string::TypeTranslator;

/// A synthetic import that keeps a module's type namespace reachable even
/// when the runtime import is dropped. At most one per module path.
#[derive(Debug, Clone)]
pub struct ForwardDeclare {
    pub module_path: String,
    pub local_alias: String,
    pub explicitly_imported: bool,
    pub default_import: bool,
}

/// Per-file translation state shared by the annotation transformer and the
/// externs generator.
pub struct ModuleTypeTranslator<'p> {
    pub(crate) checker: &'p dyn Checker,
    pub(crate) host: &'p dyn TranslatorHost,
    pub(crate) file: FileId,
    pub(crate) path: &'p str,
    pub(crate) module_path: &'p str,
    pub(crate) source: &'p str,
    pub(crate) is_for_externs: bool,
    /// Symbol identity -> local alias currently in scope. Blacklisted type
    /// parameters share this map with the literal alias `?`.
    symbol_aliases: RefCell<FxHashMap<SymbolId, String>>,
    forward_declares: RefCell<Vec<ForwardDeclare>>,
    diagnostics: RefCell<Vec<Diagnostic>>,
    next_forward_declare: Cell<usize>,
}

impl<'p> ModuleTypeTranslator<'p> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        checker: &'p dyn Checker,
        host: &'p dyn TranslatorHost,
        file: FileId,
        path: &'p str,
        module_path: &'p str,
        source: &'p str,
        is_for_externs: bool,
    ) -> Self {
        Self {
            checker,
            host,
            file,
            path,
            module_path,
            source,
            is_for_externs,
            symbol_aliases: RefCell::new(FxHashMap::default()),
            forward_declares: RefCell::new(Vec::new()),
            diagnostics: RefCell::new(Vec::new()),
            next_forward_declare: Cell::new(1),
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Record a fatal problem for this node. The traversal continues; the
    /// driver decides what to do with the accumulated list.
    pub fn error(&self, node: Node, message: impl Into<String>) {
        self.diagnostics.borrow_mut().push(Diagnostic {
            file: self.path.to_string(),
            start: node.start_byte(),
            length: node.end_byte() - node.start_byte(),
            message_text: message.into(),
            category: Category::Error,
            code: 0,
        });
    }

    /// Record a non-actionable warning iff the host accepts warnings.
    pub fn debug_warn(&self, node: Node, message: impl Into<String>) {
        if !self.host.accepts_warnings() {
            return;
        }
        let diagnostic = Diagnostic {
            file: self.path.to_string(),
            start: node.start_byte(),
            length: node.end_byte() - node.start_byte(),
            message_text: message.into(),
            category: Category::Warning,
            code: 0,
        };
        self.host.log_warning(&diagnostic);
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    // ========================================================================
    // Symbol aliases
    // ========================================================================

    pub(crate) fn alias_for(&self, symbol: SymbolId) -> Option<String> {
        self.symbol_aliases.borrow().get(&symbol).cloned()
    }

    pub(crate) fn register_alias(&self, symbol: SymbolId, alias: String) {
        self.symbol_aliases.borrow_mut().insert(symbol, alias);
    }

    /// Record a declaration's type parameters so they render as `?` inside
    /// its scope; the annotation dialect only has unconstrained templates.
    pub fn blacklist_type_parameters(&self, decl: Node) {
        let Some(params) = type_parameters(decl) else {
            return;
        };
        for param in children_of_kind(params, "type_parameter") {
            let name_node = param
                .child_by_field_name("name")
                .or_else(|| crate::parser::child_of_kind(param, "type_identifier"));
            if let Some(name_node) = name_node {
                if let Some(symbol) = self.checker.symbol_at_location(self.file, name_node) {
                    self.register_alias(symbol, "?".to_string());
                }
            }
        }
    }

    /// Names of a declaration's type parameters, for `@template`.
    pub fn type_parameter_names(&self, decl: Node) -> Vec<String> {
        let Some(params) = type_parameters(decl) else {
            return Vec::new();
        };
        children_of_kind(params, "type_parameter")
            .into_iter()
            .filter_map(|p| {
                p.child_by_field_name("name")
                    .or_else(|| crate::parser::child_of_kind(p, "type_identifier"))
            })
            .map(|n| node_text(n, self.source).to_string())
            .collect()
    }

    // ========================================================================
    // Type rendering
    // ========================================================================

    pub fn new_type_translator<'a>(&'a self, context: Node<'p>) -> TypeTranslator<'a, 'p> {
        TypeTranslator::new(self, context)
    }

    /// Render a checker-level type as an annotation-dialect string.
    pub fn translate(&self, ty: &Type, context: Node<'p>) -> String {
        self.new_type_translator(context).translate(ty)
    }

    // ========================================================================
    // Forward declares
    // ========================================================================

    /// Reserve a local alias for a module and record intent. A module
    /// already present is not re-registered, but its flags are OR-combined.
    pub fn forward_declare(
        &self,
        module_path: &str,
        explicitly_imported: bool,
        default_import: bool,
    ) -> String {
        let mut declares = self.forward_declares.borrow_mut();
        if let Some(existing) = declares.iter_mut().find(|f| f.module_path == module_path) {
            existing.explicitly_imported |= explicitly_imported;
            existing.default_import |= default_import;
            return existing.local_alias.clone();
        }
        let alias = format!("tsickle_forward_declare_{}", self.next_forward_declare.get());
        self.next_forward_declare.set(self.next_forward_declare.get() + 1);
        declares.push(ForwardDeclare {
            module_path: module_path.to_string(),
            local_alias: alias.clone(),
            explicitly_imported,
            default_import,
        });
        alias
    }

    /// Splice one synthetic statement per registered module into the file,
    /// after the file-overview comment and directive prologue and before
    /// the first semantic statement.
    pub fn insert_forward_declares(&self, root: Node, rw: &mut Rewriter) {
        let declares = self.forward_declares.borrow();
        if declares.is_empty() {
            return;
        }
        let mut pos = 0;
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "comment" => {
                    let text = node_text(child, self.source);
                    if text.contains("@fileoverview") || text.contains("@license") {
                        pos = child.end_byte();
                    }
                }
                // Directive prologue ('use strict';) stays above the
                // forward declares.
                "expression_statement"
                    if child.named_child(0).is_some_and(|e| e.kind() == "string") =>
                {
                    pos = child.end_byte();
                }
                _ => break,
            }
        }
        let mut text = String::new();
        if pos > 0 {
            text.push('\n');
        }
        for declare in declares.iter() {
            let module_name = self.host.path_to_module_name(self.path, &declare.module_path);
            text.push_str(&format!(
                "const {} = goog.forwardDeclare('{}');\n",
                declare.local_alias, module_name
            ));
        }
        rw.insert(pos, text);
    }

    pub fn forward_declares(&self) -> Vec<ForwardDeclare> {
        self.forward_declares.borrow().clone()
    }

    // ========================================================================
    // Mutable JSDoc
    // ========================================================================

    /// Handle onto a node's leading structured comment. Tag mutations are
    /// only observable in the output after `update_comment`.
    pub fn get_mutable_jsdoc(&self, anchor: Node<'p>) -> MutableJsDoc {
        let existing = leading_jsdoc(anchor, self.source);
        let tags = existing
            .and_then(|c| jsdoc::parse(node_text(c, self.source)))
            .unwrap_or_default();
        MutableJsDoc {
            tags,
            existing_range: existing.map(|c| (c.start_byte(), c.end_byte())),
            anchor_start: anchor.start_byte(),
            indent: line_indent(anchor, self.source),
        }
    }

    // ========================================================================
    // Function-type merging
    // ========================================================================

    /// Produce a composite signature comment for one or more declarations
    /// sharing a name. Per-parameter types union across overloads (padded
    /// where arities differ), the return type unions all returns, and the
    /// parameter names come from the first overload.
    ///
    /// Type parameters of every overload are blacklisted as a side effect.
    pub fn get_function_type_jsdoc(
        &self,
        overloads: &[Node<'p>],
        extra_tags: Vec<Tag>,
    ) -> (Vec<Tag>, Vec<String>) {
        let mut signatures = Vec::with_capacity(overloads.len());
        for decl in overloads {
            self.blacklist_type_parameters(*decl);
            signatures.push(self.extract_signature(*decl));
        }

        let max_arity = signatures.iter().map(|s| s.params.len()).max().unwrap_or(0);
        let min_arity = signatures.iter().map(|s| s.params.len()).min().unwrap_or(0);
        let context = overloads.first().copied();

        let mut tags = extra_tags;
        let mut parameter_names = Vec::with_capacity(max_arity);

        for i in 0..max_arity {
            let mut types = Vec::new();
            let mut optional = i >= min_arity;
            let mut rest = false;
            for sig in &signatures {
                if let Some(p) = sig.params.get(i) {
                    types.push(p.ty.clone());
                    optional |= p.optional;
                    rest |= p.rest;
                }
            }
            let first = signatures
                .first()
                .and_then(|s| s.params.get(i));
            let name = first
                .and_then(|p| p.name.clone())
                .unwrap_or_else(|| format!("__{i}"));
            let destructuring = first.is_some_and(|p| p.destructuring);

            let merged = Type::union(types);
            let merged = if rest {
                // The rest tag wants the element type.
                match merged {
                    Type::Array(element) => *element,
                    other => other,
                }
            } else {
                merged
            };
            let type_str = match context {
                Some(ctx) => self.translate(&merged, ctx),
                None => "?".to_string(),
            };
            let mut tag = Tag::param(name.clone(), type_str);
            tag.optional = optional && !rest;
            tag.rest_param = rest;
            tag.destructuring = destructuring;
            tags.push(tag);
            parameter_names.push(name);
        }

        let is_constructor = signatures.iter().any(|s| s.is_constructor);
        if !is_constructor && !signatures.is_empty() {
            let ret = Type::union(signatures.iter().map(|s| s.ret.clone()).collect());
            if ret != Type::Void {
                let type_str = match context {
                    Some(ctx) => self.translate(&ret, ctx),
                    None => "?".to_string(),
                };
                tags.push(Tag::typed("return", type_str));
            }
        }

        (tags, parameter_names)
    }

    fn extract_signature(&self, decl: Node<'p>) -> Signature {
        let mut params = Vec::new();
        if let Some(list) = decl.child_by_field_name("parameters") {
            let mut cursor = list.walk();
            for param in list.named_children(&mut cursor) {
                if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
                    continue;
                }
                let pattern = param.child_by_field_name("pattern");
                if pattern.is_some_and(|p| p.kind() == "this") {
                    continue;
                }
                let (name, rest, destructuring) = match pattern {
                    Some(p) if p.kind() == "identifier" => {
                        (Some(node_text(p, self.source).to_string()), false, false)
                    }
                    Some(p) if p.kind() == "rest_pattern" => (
                        p.named_child(0)
                            .filter(|inner| inner.kind() == "identifier")
                            .map(|inner| node_text(inner, self.source).to_string()),
                        true,
                        false,
                    ),
                    Some(_) => (None, false, true),
                    None => (None, false, false),
                };
                params.push(SignatureParam {
                    name,
                    ty: self.checker.type_at_location(self.file, param),
                    optional: param.kind() == "optional_parameter"
                        || param.child_by_field_name("value").is_some(),
                    rest,
                    destructuring,
                });
            }
        }
        let ret = decl
            .child_by_field_name("return_type")
            .and_then(|ann| ann.named_child(0))
            .map(|t| self.checker.type_at_location(self.file, t))
            .unwrap_or(Type::Unknown);
        let is_constructor = decl
            .child_by_field_name("name")
            .is_some_and(|n| node_text(n, self.source) == "constructor");
        Signature {
            params,
            ret,
            is_constructor,
        }
    }
}

struct Signature {
    params: Vec<SignatureParam>,
    ret: Type,
    is_constructor: bool,
}

struct SignatureParam {
    name: Option<String>,
    ty: Type,
    optional: bool,
    rest: bool,
    destructuring: bool,
}

/// Mutable view of a node's structured comment: `(tags, dirty)` realized
/// as a plain tag list plus an explicit flush.
pub struct MutableJsDoc {
    pub tags: Vec<Tag>,
    existing_range: Option<(usize, usize)>,
    anchor_start: usize,
    indent: String,
}

impl MutableJsDoc {
    /// Re-serialize the tags and overwrite the node's leading structured
    /// comment (or insert one). Pre-existing plain comments are untouched.
    pub fn update_comment(&self, rw: &mut Rewriter) {
        if self.tags.is_empty() {
            if let Some((start, end)) = self.existing_range {
                rw.delete(start, end);
            }
            return;
        }
        let text = jsdoc::serialize(&self.tags, true)
            .replace('\n', &format!("\n{}", self.indent));
        match self.existing_range {
            Some((start, end)) => rw.replace(start, end, text),
            None => rw.insert(self.anchor_start, format!("{}\n{}", text, self.indent)),
        }
    }
}
