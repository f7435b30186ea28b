//! Bundled syntax-directed checker
//!
//! ARCHITECTURE: `Program` parses a set of source files, builds per-scope
//! symbol tables, links imports across the files it was given, and parses
//! annotation syntax into checker-level [`Type`] values. It performs no
//! semantic checking whatsoever: the declared type of a binding is its
//! written annotation, and expressions without one degrade to `Unknown`.
//!
//! Drivers embedding a full type checker can skip this module entirely and
//! implement [`Checker`] themselves; everything downstream only sees the
//! trait.

use rustc_hash::FxHashMap;
use tree_sitter::{Node, Tree};

use crate::checker::ty::{FunctionType, ParamType, RecordProperty, Type};
use crate::checker::{Checker, DeclSite, FileId, Symbol, SymbolFlags, SymbolId};
use crate::parser::{child_of_kind, children_of_kind, node_text, type_parameters};
use crate::{ClosurizeError, Parser, Result, SourceKind};

/// Maximum binder recursion depth; degenerate nesting beyond this is
/// silently ignored rather than overflowing the stack.
const MAX_BIND_DEPTH: usize = 400;

/// One parsed source file inside a [`Program`].
pub struct ProgramFile {
    /// Path exactly as given by the driver.
    pub path: String,
    /// Path with the `.ts`/`.d.ts`/`.tsx` extension stripped; the identity
    /// used for import resolution and blacklist matching.
    pub module_path: String,
    pub source: String,
    pub tree: Tree,
    pub kind: SourceKind,
}

/// A parsed, bound set of source files implementing [`Checker`].
pub struct Program {
    files: Vec<ProgramFile>,
    symbols: Vec<Symbol>,
    /// Scope tables keyed by (file, container node id). Containers are the
    /// program root, statement blocks, and namespace bodies.
    scopes: FxHashMap<(FileId, usize), FxHashMap<String, SymbolId>>,
    /// Type-parameter tables keyed by (file, declaring node id).
    type_params: FxHashMap<(FileId, usize), FxHashMap<String, SymbolId>>,
    /// Exported name -> symbol, per file.
    exports: Vec<FxHashMap<String, SymbolId>>,
    /// Members reached through a namespace-like symbol (`ns.Foo`).
    members: FxHashMap<(SymbolId, String), SymbolId>,
}

impl Program {
    /// Parse and bind a set of `(path, source)` pairs.
    ///
    /// # Errors
    /// Fails only when a file's path has no recognizable source kind or
    /// the parser produces no tree; malformed code still binds best-effort.
    pub fn parse(inputs: Vec<(String, String)>) -> Result<Program> {
        let mut parser = Parser::new()?;
        let mut files = Vec::with_capacity(inputs.len());
        for (path, source) in inputs {
            let kind = SourceKind::from_path(std::path::Path::new(&path))
                .ok_or_else(|| ClosurizeError::UnsupportedSource(path.clone().into()))?;
            let tree = parser.parse(&source)?;
            files.push(ProgramFile {
                module_path: strip_source_extension(&path),
                path,
                source,
                tree,
                kind,
            });
        }

        let file_count = files.len();
        let mut program = Program {
            files,
            symbols: Vec::new(),
            scopes: FxHashMap::default(),
            type_params: FxHashMap::default(),
            exports: vec![FxHashMap::default(); file_count],
            members: FxHashMap::default(),
        };
        program.bind();
        Ok(program)
    }

    pub fn file(&self, id: FileId) -> Option<&ProgramFile> {
        self.files.get(id)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Resolve an import specifier against the importing file's location.
    /// Relative specifiers are joined and normalized; bare specifiers pass
    /// through untouched.
    pub fn resolve_import(&self, importer: FileId, spec: &str) -> String {
        match self.files.get(importer) {
            Some(file) => resolve_module_spec(&file.module_path, spec),
            None => spec.to_string(),
        }
    }

    /// Find a program file by resolved module path, trying the `/index`
    /// shorthand as well.
    pub fn find_module(&self, module_path: &str) -> Option<FileId> {
        self.files
            .iter()
            .position(|f| f.module_path == module_path)
            .or_else(|| {
                let with_index = format!("{module_path}/index");
                self.files.iter().position(|f| f.module_path == with_index)
            })
    }

    // ========================================================================
    // Binding
    // ========================================================================

    fn bind(&mut self) {
        for file in 0..self.files.len() {
            let tree = self.files[file].tree.clone();
            let root = tree.root_node();
            self.bind_statements(file, root, root.id(), &[], 0);
        }
        for file in 0..self.files.len() {
            let tree = self.files[file].tree.clone();
            self.bind_imports(file, tree.root_node());
        }
        for file in 0..self.files.len() {
            let tree = self.files[file].tree.clone();
            self.bind_qualified_references(file, tree.root_node(), 0);
        }
    }

    fn bind_statements(
        &mut self,
        file: FileId,
        container: Node,
        scope: usize,
        ns: &[String],
        depth: usize,
    ) {
        if depth > MAX_BIND_DEPTH {
            return;
        }
        let mut cursor = container.walk();
        let children: Vec<Node> = container.named_children(&mut cursor).collect();
        for child in children {
            self.bind_statement(file, scope, child, ns, false, depth + 1);
        }
    }

    fn bind_statement(
        &mut self,
        file: FileId,
        scope: usize,
        stmt: Node,
        ns: &[String],
        exported: bool,
        depth: usize,
    ) {
        if depth > MAX_BIND_DEPTH {
            return;
        }
        match stmt.kind() {
            "export_statement" => {
                if let Some(decl) = stmt.child_by_field_name("declaration") {
                    self.bind_statement(file, scope, decl, ns, true, depth + 1);
                } else if let Some(value) = stmt.child_by_field_name("value") {
                    self.scan_for_scopes(file, value, ns, depth + 1);
                }
            }
            "ambient_declaration" => {
                let mut cursor = stmt.walk();
                let inner: Vec<Node> = stmt.named_children(&mut cursor).collect();
                for node in inner {
                    if node.kind() == "statement_block" {
                        // `declare global { ... }` binds at a fresh scope.
                        self.bind_statements(file, node, node.id(), &[], depth + 1);
                    } else {
                        self.bind_statement(file, scope, node, ns, exported, depth + 1);
                    }
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                self.declare_named(
                    file,
                    scope,
                    stmt,
                    SymbolFlags::CLASS | SymbolFlags::TYPE | SymbolFlags::VALUE,
                    ns,
                    exported,
                );
                self.register_type_params(file, stmt);
                self.bind_class_body(file, stmt, ns, depth + 1);
            }
            "interface_declaration" => {
                self.declare_named(
                    file,
                    scope,
                    stmt,
                    SymbolFlags::INTERFACE | SymbolFlags::TYPE,
                    ns,
                    exported,
                );
                self.register_type_params(file, stmt);
                if let Some(body) = crate::parser::declaration_body(stmt) {
                    for member in children_of_kind(body, "method_signature") {
                        self.register_type_params(file, member);
                    }
                }
            }
            "type_alias_declaration" => {
                self.declare_named(
                    file,
                    scope,
                    stmt,
                    SymbolFlags::TYPE_ALIAS | SymbolFlags::TYPE,
                    ns,
                    exported,
                );
                self.register_type_params(file, stmt);
            }
            "enum_declaration" => {
                self.declare_named(
                    file,
                    scope,
                    stmt,
                    SymbolFlags::ENUM | SymbolFlags::TYPE | SymbolFlags::VALUE,
                    ns,
                    exported,
                );
            }
            "function_declaration" | "generator_function_declaration" | "function_signature" => {
                self.declare_named(
                    file,
                    scope,
                    stmt,
                    SymbolFlags::FUNCTION | SymbolFlags::VALUE,
                    ns,
                    exported,
                );
                self.bind_callable(file, stmt, ns, depth + 1);
            }
            "lexical_declaration" | "variable_declaration" => {
                for declarator in children_of_kind(stmt, "variable_declarator") {
                    if let Some(name) = declarator.child_by_field_name("name") {
                        if name.kind() == "identifier" {
                            self.declare(
                                file,
                                scope,
                                node_text(name, &self.files[file].source).to_string(),
                                SymbolFlags::VALUE,
                                declarator,
                                ns,
                                exported,
                            );
                        }
                    }
                    if let Some(value) = declarator.child_by_field_name("value") {
                        self.scan_for_scopes(file, value, ns, depth + 1);
                    }
                }
            }
            "internal_module" | "module" => {
                let name_node = stmt.child_by_field_name("name");
                let is_string_named = name_node.is_some_and(|n| n.kind() == "string");
                if let (Some(name_node), false) = (name_node, is_string_named) {
                    let name = node_text(name_node, &self.files[file].source).to_string();
                    let id = self.declare(
                        file,
                        scope,
                        name.clone(),
                        SymbolFlags::NAMESPACE | SymbolFlags::VALUE,
                        stmt,
                        ns,
                        exported,
                    );
                    if let Some(body) = crate::parser::declaration_body(stmt) {
                        let mut inner_ns = ns.to_vec();
                        inner_ns.push(name.clone());
                        self.bind_statements(file, body, body.id(), &inner_ns, depth + 1);
                        // Expose the namespace's direct members for
                        // qualified `ns.Member` lookups.
                        let inner: Vec<(String, SymbolId)> = self
                            .scopes
                            .get(&(file, body.id()))
                            .map(|t| t.iter().map(|(k, v)| (k.clone(), *v)).collect())
                            .unwrap_or_default();
                        for (member_name, member_id) in inner {
                            self.members.entry((id, member_name)).or_insert(member_id);
                        }
                    }
                } else if let Some(body) = crate::parser::declaration_body(stmt) {
                    // Declared external module (string name): bind its body
                    // in its own scope, outside any namespace.
                    self.bind_statements(file, body, body.id(), &[], depth + 1);
                }
            }
            "statement_block" => {
                self.bind_statements(file, stmt, stmt.id(), ns, depth + 1);
            }
            "import_statement" => {} // bound in the import pass
            _ => self.scan_for_scopes(file, stmt, ns, depth + 1),
        }
    }

    /// Walk non-declaration syntax looking for nested scopes (function
    /// bodies, blocks, class expressions).
    fn scan_for_scopes(&mut self, file: FileId, node: Node, ns: &[String], depth: usize) {
        if depth > MAX_BIND_DEPTH {
            return;
        }
        match node.kind() {
            "function_expression" | "arrow_function" | "generator_function"
            | "function_declaration" | "generator_function_declaration" | "method_definition" => {
                self.bind_callable(file, node, ns, depth + 1);
            }
            "class" | "class_declaration" | "abstract_class_declaration" => {
                self.bind_class_body(file, node, ns, depth + 1);
            }
            "statement_block" => {
                self.bind_statements(file, node, node.id(), ns, depth + 1);
            }
            "lexical_declaration" | "variable_declaration" => {
                // Declarations in statement position inside blocks arrive
                // through bind_statements; anything else (for-init) is
                // scanned for nested scopes only.
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.scan_for_scopes(file, child, ns, depth + 1);
                }
            }
            _ => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.scan_for_scopes(file, child, ns, depth + 1);
                }
            }
        }
    }

    fn bind_class_body(&mut self, file: FileId, class: Node, ns: &[String], depth: usize) {
        if let Some(body) = crate::parser::declaration_body(class) {
            let mut cursor = body.walk();
            let members: Vec<Node> = body.named_children(&mut cursor).collect();
            for member in members {
                match member.kind() {
                    "method_definition" => {
                        self.register_type_params(file, member);
                        self.bind_callable(file, member, ns, depth + 1);
                    }
                    "method_signature" | "abstract_method_signature" => {
                        self.register_type_params(file, member);
                    }
                    "public_field_definition" => {
                        if let Some(value) = member.child_by_field_name("value") {
                            self.scan_for_scopes(file, value, ns, depth + 1);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Bind a function-like node: its parameters land in the body scope,
    /// and the body is bound as a block.
    fn bind_callable(&mut self, file: FileId, node: Node, ns: &[String], depth: usize) {
        self.register_type_params(file, node);
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        if body.kind() != "statement_block" {
            // Arrow function with an expression body.
            self.scan_for_scopes(file, body, ns, depth + 1);
            return;
        }
        let scope = body.id();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            let param_nodes: Vec<Node> = params.named_children(&mut cursor).collect();
            for param in param_nodes {
                if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
                    continue;
                }
                if let Some(pattern) = param.child_by_field_name("pattern") {
                    if pattern.kind() == "identifier" {
                        self.declare(
                            file,
                            scope,
                            node_text(pattern, &self.files[file].source).to_string(),
                            SymbolFlags::VALUE,
                            param,
                            ns,
                            false,
                        );
                    }
                }
            }
        }
        self.bind_statements(file, body, scope, ns, depth + 1);
    }

    fn register_type_params(&mut self, file: FileId, decl: Node) {
        let Some(params) = type_parameters(decl) else {
            return;
        };
        for param in children_of_kind(params, "type_parameter") {
            let Some(name_node) = param
                .child_by_field_name("name")
                .or_else(|| child_of_kind(param, "type_identifier"))
            else {
                continue;
            };
            let name = node_text(name_node, &self.files[file].source).to_string();
            let id = self.push_symbol(Symbol {
                name: name.clone(),
                flags: SymbolFlags::TYPE_PARAMETER | SymbolFlags::TYPE,
                module_path: None,
                exported_name: name.clone(),
                namespace: Vec::new(),
                is_exported: false,
                first_decl: Some(decl_site(file, param)),
                decl_sites: vec![decl_site(file, param)],
                alias_target: None,
            });
            self.type_params
                .entry((file, decl.id()))
                .or_default()
                .insert(name, id);
        }
    }

    fn declare_named(
        &mut self,
        file: FileId,
        scope: usize,
        decl: Node,
        flags: SymbolFlags,
        ns: &[String],
        exported: bool,
    ) -> Option<SymbolId> {
        let name_node = decl.child_by_field_name("name")?;
        let name = node_text(name_node, &self.files[file].source).to_string();
        Some(self.declare(file, scope, name, flags, decl, ns, exported))
    }

    fn declare(
        &mut self,
        file: FileId,
        scope: usize,
        name: String,
        flags: SymbolFlags,
        decl: Node,
        ns: &[String],
        exported: bool,
    ) -> SymbolId {
        let site = decl_site(file, decl);
        if let Some(&existing) = self.scopes.get(&(file, scope)).and_then(|t| t.get(&name)) {
            // Declaration merging: the same name declared again widens the
            // symbol's meaning and records the extra site.
            let symbol = &mut self.symbols[existing as usize];
            symbol.flags |= flags;
            symbol.is_exported |= exported;
            symbol.decl_sites.push(site);
            return existing;
        }
        let id = self.push_symbol(Symbol {
            exported_name: name.clone(),
            name: name.clone(),
            flags,
            module_path: Some(self.files[file].module_path.clone()),
            namespace: ns.to_vec(),
            is_exported: exported,
            first_decl: Some(site),
            decl_sites: vec![site],
            alias_target: None,
        });
        self.scopes
            .entry((file, scope))
            .or_default()
            .insert(name.clone(), id);
        if exported {
            self.exports[file].insert(name, id);
        }
        id
    }

    fn push_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = self.symbols.len() as SymbolId;
        self.symbols.push(symbol);
        id
    }

    // ========================================================================
    // Import binding
    // ========================================================================

    fn bind_imports(&mut self, file: FileId, root: Node) {
        let scope = root.id();
        for stmt in children_of_kind(root, "import_statement") {
            let Some(source_node) = stmt.child_by_field_name("source") else {
                continue;
            };
            let spec = string_value(source_node, &self.files[file].source);
            let resolved = self.resolve_import(file, &spec);
            let target_file = self.find_module(&resolved);

            let Some(clause) = child_of_kind(stmt, "import_clause")
                .or_else(|| child_of_kind(stmt, "import_require_clause"))
            else {
                continue; // side-effect import binds nothing
            };

            if clause.kind() == "import_require_clause" {
                if let Some(name) = child_of_kind(clause, "identifier") {
                    self.declare_import_alias(
                        file, scope, name, "*", &resolved, target_file, true,
                    );
                }
                continue;
            }

            let mut cursor = clause.walk();
            let parts: Vec<Node> = clause.named_children(&mut cursor).collect();
            for part in parts {
                match part.kind() {
                    "identifier" => {
                        self.declare_import_alias(
                            file,
                            scope,
                            part,
                            "default",
                            &resolved,
                            target_file,
                            false,
                        );
                    }
                    "namespace_import" => {
                        if let Some(name) = child_of_kind(part, "identifier") {
                            self.declare_import_alias(
                                file, scope, name, "*", &resolved, target_file, true,
                            );
                        }
                    }
                    "named_imports" => {
                        for specifier in children_of_kind(part, "import_specifier") {
                            let Some(imported) = specifier.child_by_field_name("name") else {
                                continue;
                            };
                            let local = specifier
                                .child_by_field_name("alias")
                                .unwrap_or(imported);
                            let exported_name =
                                node_text(imported, &self.files[file].source).to_string();
                            self.declare_import_alias(
                                file,
                                scope,
                                local,
                                &exported_name,
                                &resolved,
                                target_file,
                                false,
                            );
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn declare_import_alias(
        &mut self,
        file: FileId,
        scope: usize,
        local: Node,
        exported_name: &str,
        module_path: &str,
        target_file: Option<FileId>,
        namespace_like: bool,
    ) {
        let target =
            target_file.and_then(|t| self.exports.get(t).and_then(|e| e.get(exported_name)).copied());
        let target_flags = target.map(|t| self.symbols[t as usize].flags);
        let mut flags = SymbolFlags::ALIAS
            | target_flags.unwrap_or(SymbolFlags::TYPE | SymbolFlags::INTERFACE);
        if namespace_like {
            flags |= SymbolFlags::NAMESPACE | SymbolFlags::VALUE;
        }
        let name = node_text(local, &self.files[file].source).to_string();
        let id = self.push_symbol(Symbol {
            name: name.clone(),
            flags,
            module_path: Some(module_path.to_string()),
            exported_name: exported_name.to_string(),
            namespace: Vec::new(),
            is_exported: false,
            first_decl: Some(decl_site(file, local)),
            decl_sites: vec![decl_site(file, local)],
            alias_target: target,
        });
        self.scopes.entry((file, scope)).or_default().insert(name, id);
        // Members of a resolvable namespace import are reachable by name.
        if namespace_like {
            if let Some(t) = target_file {
                let entries: Vec<(String, SymbolId)> = self.exports[t]
                    .iter()
                    .map(|(k, v)| (k.clone(), *v))
                    .collect();
                for (member_name, member_id) in entries {
                    self.members.entry((id, member_name)).or_insert(member_id);
                }
            }
        }
    }

    // ========================================================================
    // Qualified reference synthesis
    // ========================================================================

    /// Pre-bind `ns.Member` references whose container is an import alias
    /// to a module outside the program, so that later `symbol()` queries
    /// need no interior mutability.
    fn bind_qualified_references(&mut self, file: FileId, node: Node, depth: usize) {
        if depth > MAX_BIND_DEPTH {
            return;
        }
        if matches!(node.kind(), "nested_type_identifier" | "member_expression") {
            self.synthesize_member(file, node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.bind_qualified_references(file, child, depth + 1);
        }
    }

    fn synthesize_member(&mut self, file: FileId, node: Node) {
        let (container_node, member_node) = match node.kind() {
            "nested_type_identifier" => (
                node.child_by_field_name("module"),
                node.child_by_field_name("name"),
            ),
            _ => (
                node.child_by_field_name("object"),
                node.child_by_field_name("property"),
            ),
        };
        let (Some(container_node), Some(member_node)) = (container_node, member_node) else {
            return;
        };
        let Some(container) = self.symbol_at_location(file, container_node) else {
            return;
        };
        let container_sym = &self.symbols[container as usize];
        if !container_sym
            .flags
            .intersects(SymbolFlags::NAMESPACE | SymbolFlags::ALIAS)
        {
            return;
        }
        let member_name = node_text(member_node, &self.files[file].source).to_string();
        if self.members.contains_key(&(container, member_name.clone())) {
            return;
        }
        let module_path = container_sym.module_path.clone();
        let id = self.push_symbol(Symbol {
            name: member_name.clone(),
            // Assumed shape of an unseen export: a type usable in both
            // heritage positions.
            flags: SymbolFlags::TYPE | SymbolFlags::INTERFACE,
            module_path,
            exported_name: member_name.clone(),
            namespace: Vec::new(),
            is_exported: true,
            first_decl: None,
            decl_sites: Vec::new(),
            alias_target: None,
        });
        self.members.insert((container, member_name), id);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    fn lookup_name(&self, file: FileId, from: Node, text: &str) -> Option<SymbolId> {
        let mut node = Some(from);
        while let Some(n) = node {
            if let Some(id) = self
                .type_params
                .get(&(file, n.id()))
                .and_then(|t| t.get(text))
            {
                return Some(*id);
            }
            if let Some(id) = self.scopes.get(&(file, n.id())).and_then(|t| t.get(text)) {
                return Some(*id);
            }
            node = n.parent();
        }
        None
    }

    fn find_decl_node<'a>(&'a self, site: DeclSite) -> Option<Node<'a>> {
        let file = self.files.get(site.file)?;
        let mut node = file
            .tree
            .root_node()
            .descendant_for_byte_range(site.start, site.end)?;
        while node.id() != site.node_id {
            node = node.parent()?;
        }
        Some(node)
    }

    // ========================================================================
    // Syntax -> Type
    // ========================================================================

    /// Parse a type node into a checker-level type. Constructs without a
    /// sound annotation equivalent produce `Unknown`.
    pub fn parse_type(&self, file: FileId, node: Node) -> Type {
        let source = match self.files.get(file) {
            Some(f) => f.source.as_str(),
            None => return Type::Unknown,
        };
        match node.kind() {
            "predefined_type" => match node_text(node, source) {
                "string" => Type::String,
                "number" => Type::Number,
                "boolean" => Type::Boolean,
                "void" => Type::Void,
                "symbol" => Type::Symbol,
                "object" => Type::Object,
                "undefined" => Type::Undefined,
                // any, unknown, never
                _ => Type::Unknown,
            },
            "literal_type" => {
                let text = node_text(node, source);
                if text == "null" {
                    Type::Null
                } else if text == "undefined" {
                    Type::Undefined
                } else {
                    match node.named_child(0).map(|c| c.kind()) {
                        Some("string" | "template_string") => Type::String,
                        Some("number" | "unary_expression") => Type::Number,
                        Some("true" | "false") => Type::Boolean,
                        Some("null") => Type::Null,
                        Some("undefined") => Type::Undefined,
                        _ => Type::Unknown,
                    }
                }
            }
            "type_identifier" => {
                let text = node_text(node, source);
                match text {
                    "undefined" => Type::Undefined,
                    _ => self.reference_for(file, node, Vec::new()),
                }
            }
            "nested_type_identifier" => self.reference_for(file, node, Vec::new()),
            "generic_type" => {
                let args = node
                    .child_by_field_name("type_arguments")
                    .or_else(|| child_of_kind(node, "type_arguments"))
                    .map(|args_node| {
                        let mut cursor = args_node.walk();
                        args_node
                            .named_children(&mut cursor)
                            .map(|a| self.parse_type(file, a))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                let Some(name) = node
                    .child_by_field_name("name")
                    .or_else(|| child_of_kind(node, "type_identifier"))
                    .or_else(|| child_of_kind(node, "nested_type_identifier"))
                else {
                    return Type::Unknown;
                };
                let name_text = node_text(name, source);
                if matches!(name_text, "Array" | "ReadonlyArray") {
                    let element = args.into_iter().next().unwrap_or(Type::Unknown);
                    return Type::Array(Box::new(element));
                }
                self.reference_for(file, name, args)
            }
            "union_type" => {
                let mut cursor = node.walk();
                let members: Vec<Type> = node
                    .named_children(&mut cursor)
                    .map(|m| self.parse_type(file, m))
                    .collect();
                Type::union(members)
            }
            "array_type" => {
                let element = node
                    .named_child(0)
                    .map(|e| self.parse_type(file, e))
                    .unwrap_or(Type::Unknown);
                Type::Array(Box::new(element))
            }
            "tuple_type" => Type::Array(Box::new(Type::Unknown)),
            "parenthesized_type" | "readonly_type" => node
                .named_child(0)
                .map(|inner| self.parse_type(file, inner))
                .unwrap_or(Type::Unknown),
            "function_type" => self.parse_function_type(file, node),
            "object_type" => self.parse_object_type(file, node),
            // intersection, conditional, mapped, lookup, typeof, keyof,
            // template literal types: no sound equivalent
            _ => {
                let text = node_text(node, source);
                match text {
                    "null" => Type::Null,
                    "undefined" => Type::Undefined,
                    _ => Type::Unknown,
                }
            }
        }
    }

    fn reference_for(&self, file: FileId, name_node: Node, type_args: Vec<Type>) -> Type {
        let Some(symbol) = self.symbol_at_location(file, name_node) else {
            return Type::Unknown;
        };
        let sym = &self.symbols[symbol as usize];
        if sym.flags.contains(SymbolFlags::TYPE_PARAMETER) {
            return Type::TypeParameter {
                symbol,
                name: sym.name.clone(),
            };
        }
        Type::Reference { symbol, type_args }
    }

    fn parse_function_type(&self, file: FileId, node: Node) -> Type {
        let mut params = Vec::new();
        let mut this_type = None;
        if let Some(param_list) = node
            .child_by_field_name("parameters")
            .or_else(|| child_of_kind(node, "formal_parameters"))
        {
            let mut cursor = param_list.walk();
            let param_nodes: Vec<Node> = param_list.named_children(&mut cursor).collect();
            for param in param_nodes {
                let optional = param.kind() == "optional_parameter";
                if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
                    continue;
                }
                let ty = param
                    .child_by_field_name("type")
                    .and_then(|ann| ann.named_child(0))
                    .map(|t| self.parse_type(file, t))
                    .unwrap_or(Type::Unknown);
                let pattern = param.child_by_field_name("pattern");
                if pattern.is_some_and(|p| p.kind() == "this") {
                    this_type = Some(ty);
                    continue;
                }
                let rest = pattern.is_some_and(|p| p.kind() == "rest_pattern");
                params.push(ParamType { ty, optional, rest });
            }
        }
        let ret = node
            .child_by_field_name("return_type")
            .map(|r| {
                if r.kind() == "type_annotation" {
                    r.named_child(0)
                        .map(|t| self.parse_type(file, t))
                        .unwrap_or(Type::Unknown)
                } else {
                    self.parse_type(file, r)
                }
            })
            .or_else(|| {
                // The return type is the last named child after `=>`.
                let count = node.named_child_count();
                (count > 0)
                    .then(|| node.named_child(count - 1))
                    .flatten()
                    .filter(|last| last.kind() != "formal_parameters")
                    .map(|last| self.parse_type(file, last))
            })
            .unwrap_or(Type::Unknown);
        Type::Function(Box::new(FunctionType {
            this_type,
            params,
            ret,
        }))
    }

    fn parse_object_type(&self, file: FileId, node: Node) -> Type {
        let source = &self.files[file].source;
        let mut props = Vec::new();
        let mut index: Option<(Type, Type)> = None;
        let mut cursor = node.walk();
        let members: Vec<Node> = node.named_children(&mut cursor).collect();
        for member in members {
            match member.kind() {
                "property_signature" => {
                    let Some(name) = member.child_by_field_name("name") else {
                        return Type::Unknown;
                    };
                    let ty = member
                        .child_by_field_name("type")
                        .and_then(|ann| ann.named_child(0))
                        .map(|t| self.parse_type(file, t))
                        .unwrap_or(Type::Unknown);
                    props.push(RecordProperty {
                        name: node_text(name, source).to_string(),
                        ty,
                        optional: crate::parser::has_modifier(member, "?"),
                    });
                }
                "index_signature" => {
                    let key = child_of_kind(member, "type_annotation")
                        .and_then(|ann| ann.named_child(0))
                        .map(|t| self.parse_type(file, t))
                        .unwrap_or(Type::String);
                    let value = member
                        .child_by_field_name("type")
                        .and_then(|ann| ann.named_child(0))
                        .map(|t| self.parse_type(file, t))
                        .unwrap_or(Type::Unknown);
                    index = Some((key, value));
                }
                "comment" => {}
                _ => return Type::Unknown,
            }
        }
        match (props.is_empty(), index) {
            (true, Some((key, value))) => Type::IndexMap {
                key: Box::new(key),
                value: Box::new(value),
            },
            (_, None) => Type::Record(props),
            _ => Type::Unknown,
        }
    }

    fn type_of_expression(&self, file: FileId, node: Node) -> Type {
        let source = match self.files.get(file) {
            Some(f) => f.source.as_str(),
            None => return Type::Unknown,
        };
        match node.kind() {
            "identifier" => self
                .symbol_at_location(file, node)
                .map(|s| self.declared_type_of_symbol(s))
                .unwrap_or(Type::Unknown),
            "string" | "template_string" => Type::String,
            "number" => Type::Number,
            "true" | "false" => Type::Boolean,
            "null" => Type::Null,
            "undefined" => Type::Undefined,
            "parenthesized_expression" => node
                .named_child(0)
                .map(|inner| self.type_of_expression(file, inner))
                .unwrap_or(Type::Unknown),
            "non_null_expression" => node
                .named_child(0)
                .map(|inner| self.type_of_expression(file, inner).non_nullable())
                .unwrap_or(Type::Unknown),
            "as_expression" | "satisfies_expression" => {
                let count = node.named_child_count();
                let target = (count > 1).then(|| node.named_child(count - 1)).flatten();
                match target {
                    Some(t) if node_text(t, source) != "const" && is_type_kind(t.kind()) => {
                        self.parse_type(file, t)
                    }
                    _ => node
                        .named_child(0)
                        .map(|inner| self.type_of_expression(file, inner))
                        .unwrap_or(Type::Unknown),
                }
            }
            "new_expression" => node
                .child_by_field_name("constructor")
                .and_then(|c| self.symbol_at_location(file, c))
                .map(|symbol| Type::Reference {
                    symbol,
                    type_args: Vec::new(),
                })
                .unwrap_or(Type::Unknown),
            "member_expression" => self
                .symbol_at_location(file, node)
                .map(|s| self.declared_type_of_symbol(s))
                .unwrap_or(Type::Unknown),
            _ => Type::Unknown,
        }
    }
}

/// Node kinds that denote types rather than expressions.
pub(crate) fn is_type_kind(kind: &str) -> bool {
    matches!(
        kind,
        "predefined_type"
            | "type_identifier"
            | "nested_type_identifier"
            | "generic_type"
            | "union_type"
            | "intersection_type"
            | "array_type"
            | "tuple_type"
            | "parenthesized_type"
            | "function_type"
            | "object_type"
            | "literal_type"
            | "readonly_type"
            | "conditional_type"
            | "lookup_type"
            | "template_literal_type"
            | "type_query"
            | "index_type_query"
    )
}

impl Checker for Program {
    fn symbol_at_location(&self, file: FileId, node: Node<'_>) -> Option<SymbolId> {
        let source = self.files.get(file)?.source.as_str();
        match node.kind() {
            "identifier" | "type_identifier" | "property_identifier" => {
                self.lookup_name(file, node, node_text(node, source))
            }
            "nested_type_identifier" => {
                let container = self.symbol_at_location(file, node.child_by_field_name("module")?)?;
                let member = node_text(node.child_by_field_name("name")?, source);
                self.members.get(&(container, member.to_string())).copied()
            }
            "member_expression" => {
                let container = self.symbol_at_location(file, node.child_by_field_name("object")?)?;
                let member = node_text(node.child_by_field_name("property")?, source);
                self.members.get(&(container, member.to_string())).copied()
            }
            _ => {
                // Declarations resolve through their name.
                let name = node.child_by_field_name("name")?;
                self.symbol_at_location(file, name)
            }
        }
    }

    fn aliased_symbol(&self, symbol: SymbolId) -> SymbolId {
        self.symbols
            .get(symbol as usize)
            .and_then(|s| s.alias_target)
            .unwrap_or(symbol)
    }

    fn declared_type_of_symbol(&self, symbol: SymbolId) -> Type {
        let Some(sym) = self.symbols.get(symbol as usize) else {
            return Type::Unknown;
        };
        if sym.flags.contains(SymbolFlags::TYPE_PARAMETER) {
            return Type::TypeParameter {
                symbol,
                name: sym.name.clone(),
            };
        }
        if sym.flags.contains(SymbolFlags::ALIAS) {
            if let Some(target) = sym.alias_target {
                return self.declared_type_of_symbol(target);
            }
            return Type::Reference {
                symbol,
                type_args: Vec::new(),
            };
        }
        if sym
            .flags
            .intersects(SymbolFlags::CLASS | SymbolFlags::INTERFACE | SymbolFlags::ENUM)
        {
            return Type::Reference {
                symbol,
                type_args: Vec::new(),
            };
        }
        let Some(site) = sym.first_decl else {
            return Type::Reference {
                symbol,
                type_args: Vec::new(),
            };
        };
        let Some(decl) = self.find_decl_node(site) else {
            return Type::Unknown;
        };
        if sym.flags.contains(SymbolFlags::TYPE_ALIAS) {
            return decl
                .child_by_field_name("value")
                .map(|v| self.parse_type(site.file, v))
                .unwrap_or(Type::Unknown);
        }
        if sym.flags.contains(SymbolFlags::FUNCTION) {
            return self.function_type_of(site.file, decl);
        }
        self.type_at_location(site.file, decl)
    }

    fn type_at_location(&self, file: FileId, node: Node<'_>) -> Type {
        match node.kind() {
            "variable_declarator"
            | "public_field_definition"
            | "property_signature"
            | "required_parameter"
            | "optional_parameter" => {
                if let Some(ty) = node
                    .child_by_field_name("type")
                    .filter(|ann| ann.kind() == "type_annotation")
                    .and_then(|ann| ann.named_child(0))
                {
                    return self.parse_type(file, ty);
                }
                node.child_by_field_name("value")
                    .map(|v| self.type_of_expression(file, v))
                    .unwrap_or(Type::Unknown)
            }
            kind if is_type_kind(kind) => self.parse_type(file, node),
            _ => self.type_of_expression(file, node),
        }
    }

    fn symbol(&self, symbol: SymbolId) -> Symbol {
        self.symbols
            .get(symbol as usize)
            .cloned()
            .unwrap_or(Symbol {
                name: String::new(),
                flags: SymbolFlags::empty(),
                module_path: None,
                exported_name: String::new(),
                namespace: Vec::new(),
                is_exported: false,
                first_decl: None,
                decl_sites: Vec::new(),
                alias_target: None,
            })
    }
}

impl Program {
    /// The composite function type of a single function-like declaration.
    fn function_type_of(&self, file: FileId, decl: Node) -> Type {
        let mut params = Vec::new();
        if let Some(param_list) = decl.child_by_field_name("parameters") {
            let mut cursor = param_list.walk();
            for param in param_list.named_children(&mut cursor) {
                if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
                    continue;
                }
                let rest = param
                    .child_by_field_name("pattern")
                    .is_some_and(|p| p.kind() == "rest_pattern");
                params.push(ParamType {
                    ty: self.type_at_location(file, param),
                    optional: param.kind() == "optional_parameter",
                    rest,
                });
            }
        }
        let ret = decl
            .child_by_field_name("return_type")
            .and_then(|ann| ann.named_child(0))
            .map(|t| self.parse_type(file, t))
            .unwrap_or(Type::Unknown);
        Type::Function(Box::new(FunctionType {
            this_type: None,
            params,
            ret,
        }))
    }
}

fn decl_site(file: FileId, node: Node) -> DeclSite {
    DeclSite {
        file,
        node_id: node.id(),
        start: node.start_byte(),
        end: node.end_byte(),
    }
}

/// Join a relative import specifier onto the importer's module path and
/// normalize `.`/`..` segments. Bare specifiers pass through untouched.
pub(crate) fn resolve_module_spec(importer_module_path: &str, spec: &str) -> String {
    if !spec.starts_with('.') {
        return spec.to_string();
    }
    let dir = match importer_module_path.rfind('/') {
        Some(i) => &importer_module_path[..i],
        None => "",
    };
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for part in spec.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if importer_module_path.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

fn strip_source_extension(path: &str) -> String {
    for ext in [".d.ts", ".tsx", ".ts"] {
        if let Some(stripped) = path.strip_suffix(ext) {
            return stripped.to_string();
        }
    }
    path.to_string()
}

/// The unquoted value of a string literal node.
pub(crate) fn string_value(node: Node, source: &str) -> String {
    child_of_kind(node, "string_fragment")
        .map(|f| node_text(f, source).to_string())
        .unwrap_or_else(|| node_text(node, source).trim_matches(['\'', '"']).to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn program(source: &str) -> Program {
        Program::parse(vec![("test.ts".to_string(), source.to_string())]).unwrap()
    }

    fn first_decl<'a>(p: &'a Program, kind: &str) -> Node<'a> {
        let root = p.file(0).unwrap().tree.root_node();
        let mut cursor = root.walk();
        let found = root
            .named_children(&mut cursor)
            .find(|c| c.kind() == kind)
            .unwrap();
        found
    }

    #[test]
    fn test_binds_top_level_declarations() {
        let p = program("class C {}\ninterface I {}\ntype T = string;\nconst x = 1;");
        let class = first_decl(&p, "class_declaration");
        let id = p.symbol_at_location(0, class).unwrap();
        let sym = p.symbol(id);
        assert!(sym.is_class());
        assert!(sym.is_value());
    }

    #[test]
    fn test_declaration_merging_widens_flags() {
        let p = program("interface Dual {}\nfunction Dual(): void {}");
        let iface = first_decl(&p, "interface_declaration");
        let id = p.symbol_at_location(0, iface).unwrap();
        let sym = p.symbol(id);
        assert!(sym.is_interface());
        assert!(sym.is_value());
        assert_eq!(sym.decl_sites.len(), 2);
    }

    #[test]
    fn test_declared_type_from_annotation() {
        let p = program("let s: string | null;");
        let stmt = first_decl(&p, "lexical_declaration");
        let declarator = child_of_kind(stmt, "variable_declarator").unwrap();
        let ty = p.type_at_location(0, declarator);
        assert_eq!(ty, Type::Union(vec![Type::String, Type::Null]));
    }

    #[test]
    fn test_type_parameter_resolution() {
        let p = program("class Box<T> { value: T; }");
        let class = first_decl(&p, "class_declaration");
        let body = class.child_by_field_name("body").unwrap();
        let field = child_of_kind(body, "public_field_definition").unwrap();
        let ty = p.type_at_location(0, field);
        assert!(matches!(ty, Type::TypeParameter { ref name, .. } if name == "T"));
    }

    #[test]
    fn test_import_binding_across_files() {
        let p = Program::parse(vec![
            (
                "lib.ts".to_string(),
                "export class Widget {}".to_string(),
            ),
            (
                "app.ts".to_string(),
                "import {Widget} from './lib';\nlet w: Widget;".to_string(),
            ),
        ])
        .unwrap();
        let root = p.file(1).unwrap().tree.root_node();
        let stmt = children_of_kind(root, "lexical_declaration")[0];
        let declarator = child_of_kind(stmt, "variable_declarator").unwrap();
        let ty = p.type_at_location(1, declarator);
        let Type::Reference { symbol, .. } = ty else {
            panic!("expected reference, got {ty:?}");
        };
        let aliased = p.aliased_symbol(symbol);
        assert_ne!(aliased, symbol);
        assert!(p.symbol(aliased).is_class());
    }

    #[test]
    fn test_resolve_import_normalizes() {
        let p = Program::parse(vec![(
            "src/nested/app.ts".to_string(),
            String::new(),
        )])
        .unwrap();
        assert_eq!(p.resolve_import(0, "./sib"), "src/nested/sib");
        assert_eq!(p.resolve_import(0, "../other"), "src/other");
        assert_eq!(p.resolve_import(0, "lodash"), "lodash");
    }

    #[test]
    fn test_array_and_generic_types() {
        let p = program("let xs: Array<string>;\nlet ys: number[];");
        let root = p.file(0).unwrap().tree.root_node();
        let decls = children_of_kind(root, "lexical_declaration");
        let first = child_of_kind(decls[0], "variable_declarator").unwrap();
        assert_eq!(p.type_at_location(0, first), Type::Array(Box::new(Type::String)));
        let second = child_of_kind(decls[1], "variable_declarator").unwrap();
        assert_eq!(
            p.type_at_location(0, second),
            Type::Array(Box::new(Type::Number))
        );
    }

    #[test]
    fn test_non_null_expression_type() {
        let p = program("let foo: string | null;\nconst b = foo!;");
        let root = p.file(0).unwrap().tree.root_node();
        let second = children_of_kind(root, "lexical_declaration")[1];
        let declarator = child_of_kind(second, "variable_declarator").unwrap();
        let value = declarator.child_by_field_name("value").unwrap();
        assert_eq!(value.kind(), "non_null_expression");
        assert_eq!(p.type_of_expression(0, value), Type::String);
    }
}
