//! Type-String Translator
//!
//! Renders a checker-level [`Type`] as an annotation-dialect string, e.g.
//! `string`, `(string|number)`, `!Foo<?>`, or
//! `function(this: !Bar, number): string`. Untranslatable shapes degrade
//! to the unknown annotation `?`.

use std::cell::RefCell;

use rustc_hash::FxHashSet;
use tree_sitter::Node;

use crate::checker::ty::{FunctionType, Type};
use crate::checker::{Checker, SymbolId};
use crate::translator::ModuleTypeTranslator;
use crate::types::ModuleFormat;

/// Short-lived translation context: one per call site, wrapping the
/// parent per-file translator and the node providing scope-relative
/// naming.
pub struct TypeTranslator<'a, 'p> {
    mtt: &'a ModuleTypeTranslator<'p>,
    context: Node<'p>,
    /// Alias symbols currently being expanded, for cycle breaking.
    resolving: RefCell<FxHashSet<SymbolId>>,
}

impl<'a, 'p> TypeTranslator<'a, 'p> {
    pub(crate) fn new(mtt: &'a ModuleTypeTranslator<'p>, context: Node<'p>) -> Self {
        Self {
            mtt,
            context,
            resolving: RefCell::new(FxHashSet::default()),
        }
    }

    /// Record a declaration's type parameters so they render as `?` within
    /// its scope. Delegates to the per-file alias map.
    pub fn blacklist_type_parameters(&self, decl: Node) {
        self.mtt.blacklist_type_parameters(decl);
    }

    /// Render a type. Every call returns `?` when the host runs untyped.
    pub fn translate(&self, ty: &Type) -> String {
        if self.mtt.host.untyped() {
            return "?".to_string();
        }
        self.translate_inner(ty)
    }

    fn translate_inner(&self, ty: &Type) -> String {
        match ty {
            Type::Unknown => "?".to_string(),
            Type::String => "string".to_string(),
            Type::Number => "number".to_string(),
            Type::Boolean => "boolean".to_string(),
            Type::Void => "void".to_string(),
            Type::Undefined => "undefined".to_string(),
            Type::Null => "null".to_string(),
            Type::Symbol => "symbol".to_string(),
            Type::Object => "!Object".to_string(),
            Type::TypeParameter { symbol, name } => {
                // A blacklisted type parameter carries the alias `?`.
                self.mtt.alias_for(*symbol).unwrap_or_else(|| name.clone())
            }
            Type::Union(members) => self.translate_union(members),
            Type::Array(element) => format!("!Array<{}>", self.translate_inner(element)),
            Type::Function(f) => self.translate_function(f),
            Type::Record(props) => {
                let fields: Vec<String> = props
                    .iter()
                    .map(|p| {
                        let ty = self.translate_inner(&p.ty);
                        if p.optional {
                            format!("{}: ({}|undefined)", p.name, ty)
                        } else {
                            format!("{}: {}", p.name, ty)
                        }
                    })
                    .collect();
                format!("{{{}}}", fields.join(", "))
            }
            Type::IndexMap { key, value } => format!(
                "!Object<{}, {}>",
                self.translate_inner(key),
                self.translate_inner(value)
            ),
            Type::Reference { symbol, type_args } => self.translate_reference(*symbol, type_args),
        }
    }

    fn translate_reference(&self, symbol: SymbolId, type_args: &[Type]) -> String {
        if self.is_blacklisted(symbol) {
            return "?".to_string();
        }
        if let Some(alias) = self.mtt.alias_for(symbol) {
            // A registered alias short-circuits naming; `?` marks a
            // blacklisted scope.
            if alias == "?" {
                return alias;
            }
            return self.named(alias, type_args);
        }

        let resolved = self.mtt.checker.aliased_symbol(symbol);
        let sym = self.mtt.checker.symbol(resolved);

        if sym.is_type_alias() {
            // Aliases without an emitted typedef resolve inline; cycles
            // (possible with declaration merging) break to `?`.
            let emits_typedef = sym.is_exported
                && self.mtt.host.module_format() == ModuleFormat::TARGET;
            if !emits_typedef {
                if !self.resolving.borrow_mut().insert(resolved) {
                    self.mtt
                        .debug_warn(self.context, format!("circular type alias: {}", sym.name));
                    return "?".to_string();
                }
                let expanded =
                    self.translate_inner(&self.mtt.checker.declared_type_of_symbol(resolved));
                self.resolving.borrow_mut().remove(&resolved);
                return expanded;
            }
        }

        match self.symbol_to_string(symbol, true) {
            Some(name) => self.named(name, type_args),
            None => "?".to_string(),
        }
    }

    fn named(&self, name: String, type_args: &[Type]) -> String {
        let mut out = format!("!{name}");
        if !type_args.is_empty() {
            let args: Vec<String> = type_args.iter().map(|a| self.translate_inner(a)).collect();
            out.push('<');
            out.push_str(&args.join(", "));
            out.push('>');
        }
        out
    }

    /// Union members render independently; the null atom folds into a `?`
    /// prefix on named members when one exists, and primitives are never
    /// prefixed.
    fn translate_union(&self, members: &[Type]) -> String {
        let mut rendered: Vec<String> = Vec::with_capacity(members.len());
        let mut has_null = false;
        let mut has_undefined = false;
        for member in members {
            match member {
                Type::Null => has_null = true,
                Type::Undefined => has_undefined = true,
                other => {
                    let s = self.translate_inner(other);
                    if !rendered.contains(&s) {
                        rendered.push(s);
                    }
                }
            }
        }
        if has_null {
            let mut folded = false;
            for s in rendered.iter_mut() {
                if let Some(rest) = s.strip_prefix('!') {
                    *s = format!("?{rest}");
                    folded = true;
                }
            }
            if !folded {
                rendered.push("null".to_string());
            }
        }
        if has_undefined {
            rendered.push("undefined".to_string());
        }
        match rendered.len() {
            0 => "?".to_string(),
            1 => rendered.remove(0),
            _ => format!("({})", rendered.join("|")),
        }
    }

    fn translate_function(&self, f: &FunctionType) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(f.params.len() + 1);
        if let Some(this_type) = &f.this_type {
            parts.push(format!("this: {}", self.translate_inner(this_type)));
        }
        for param in &f.params {
            let ty = if param.rest {
                match &param.ty {
                    Type::Array(element) => format!("...{}", self.translate_inner(element)),
                    other => format!("...{}", self.translate_inner(other)),
                }
            } else if param.optional {
                format!("{}=", self.translate_inner(&param.ty))
            } else {
                self.translate_inner(&param.ty)
            };
            parts.push(ty);
        }
        format!(
            "function({}): {}",
            parts.join(", "),
            self.translate_inner(&f.ret)
        )
    }

    /// Whether a symbol's declaring module is opaque to translation.
    pub fn is_blacklisted(&self, symbol: SymbolId) -> bool {
        let resolved = self.mtt.checker.aliased_symbol(symbol);
        for candidate in [symbol, resolved] {
            let sym = self.mtt.checker.symbol(candidate);
            if let Some(module_path) = &sym.module_path {
                let blacklist = self.mtt.host.type_blacklist_paths();
                if blacklist.contains(module_path)
                    || blacklist.contains(&format!("{module_path}.ts"))
                    || blacklist.contains(&format!("{module_path}.d.ts"))
                {
                    return true;
                }
            }
        }
        false
    }

    /// Render a symbol's name as visible from the current file, consulting
    /// the alias map and registering a forward declare when the symbol
    /// lives in another module.
    pub fn symbol_to_string(&self, symbol: SymbolId, use_fqn: bool) -> Option<String> {
        if let Some(alias) = self.mtt.alias_for(symbol) {
            return Some(alias);
        }
        let sym = self.mtt.checker.symbol(symbol);
        if sym.name.is_empty() {
            return None;
        }

        let qualified = |name: &str| {
            if use_fqn && !sym.namespace.is_empty() {
                format!("{}.{}", sym.namespace.join("."), name)
            } else {
                name.to_string()
            }
        };

        match &sym.module_path {
            Some(module_path) if module_path != self.mtt.module_path => {
                if self.mtt.is_for_externs {
                    // Externs are global; qualify through the mangled
                    // module namespace instead of forward declares.
                    return Some(qualified(&sym.exported_name));
                }
                let alias = self.mtt.forward_declare(module_path, false, false);
                if sym.exported_name == "*" {
                    Some(alias)
                } else {
                    Some(format!("{}.{}", alias, sym.exported_name))
                }
            }
            _ => Some(qualified(&sym.name)),
        }
    }
}
