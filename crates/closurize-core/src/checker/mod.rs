//! Type-checker contract
//!
//! ARCHITECTURE: The translator consumes the checker through this narrow,
//! read-only trait. The bundled [`binder::Program`] implements it with a
//! syntax-directed symbol table; a driver embedding a richer checker can
//! supply its own implementation.

pub mod binder;
pub mod ty;

use bitflags::bitflags;
use tree_sitter::Node;
use ty::Type;

/// Index of a source file within a program.
pub type FileId = usize;

/// Identity of a symbol within a checker.
pub type SymbolId = u32;

bitflags! {
    /// What a symbol's name means in each of the value/type namespaces.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SymbolFlags: u16 {
        const VALUE = 1 << 0;
        const TYPE = 1 << 1;
        const ALIAS = 1 << 2;
        const CLASS = 1 << 3;
        const INTERFACE = 1 << 4;
        const TYPE_ALIAS = 1 << 5;
        const ENUM = 1 << 6;
        const FUNCTION = 1 << 7;
        const NAMESPACE = 1 << 8;
        const TYPE_PARAMETER = 1 << 9;
    }
}

/// One declaration site of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclSite {
    pub file: FileId,
    /// tree-sitter node identity, unique within the file's tree.
    pub node_id: usize,
    pub start: usize,
    pub end: usize,
}

/// A named entity the checker knows about.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub flags: SymbolFlags,
    /// Path of the module the symbol is declared in, extension stripped.
    /// `None` for symbols with no module of origin (type parameters).
    pub module_path: Option<String>,
    /// Name the symbol is exported under from its declaring module.
    pub exported_name: String,
    /// Enclosing namespace chain for symbols declared inside namespaces.
    pub namespace: Vec<String>,
    /// Whether the declaring module exports this symbol.
    pub is_exported: bool,
    /// First declaration site. Declaration merging keeps the first and
    /// appends the rest to `decl_sites`.
    pub first_decl: Option<DeclSite>,
    /// Every declaration of this symbol, in binding order.
    pub decl_sites: Vec<DeclSite>,
    /// For import aliases: the symbol in the target module, when resolvable.
    pub alias_target: Option<SymbolId>,
}

impl Symbol {
    pub fn is_value(&self) -> bool {
        self.flags.contains(SymbolFlags::VALUE)
    }

    pub fn is_type(&self) -> bool {
        self.flags.contains(SymbolFlags::TYPE)
    }

    pub fn is_class(&self) -> bool {
        self.flags.contains(SymbolFlags::CLASS)
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(SymbolFlags::INTERFACE)
    }

    pub fn is_type_alias(&self) -> bool {
        self.flags.contains(SymbolFlags::TYPE_ALIAS)
    }

    pub fn is_alias(&self) -> bool {
        self.flags.contains(SymbolFlags::ALIAS)
    }
}

/// Read-only view of the type checker.
///
/// All operations may be called re-entrantly from any visitor; none
/// mutate checker state.
pub trait Checker {
    /// Symbol for an identifier-like node, or `None` when unresolvable.
    fn symbol_at_location(&self, file: FileId, node: Node<'_>) -> Option<SymbolId>;

    /// Follow one level of import aliasing; returns the input when the
    /// symbol is not an alias or the target is unknown.
    fn aliased_symbol(&self, symbol: SymbolId) -> SymbolId;

    /// The declared type of a symbol (annotation, alias value, or the
    /// instance type of a class-like).
    fn declared_type_of_symbol(&self, symbol: SymbolId) -> Type;

    /// The type of an expression or declaration node.
    fn type_at_location(&self, file: FileId, node: Node<'_>) -> Type;

    /// The input type with the null and undefined atoms removed.
    fn non_nullable_type(&self, ty: &Type) -> Type {
        ty.non_nullable()
    }

    /// Flag and identity information for a symbol.
    fn symbol(&self, symbol: SymbolId) -> Symbol;
}
