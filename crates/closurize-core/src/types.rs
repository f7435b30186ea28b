//! Core type definitions for Closurize
//!
//! ARCHITECTURE: This module defines the types shared across the library:
//! the host contract, diagnostics, the error enum, and the parser wrapper.
//! Design principle: type-first development with explicit error handling.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Source Kinds
// ============================================================================

/// The two flavors of input the translator accepts.
///
/// Non-declaration sources are rewritten in place by the annotation
/// transformer; declaration-only sources feed the externs generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A regular source file (`.ts`) with runtime code.
    Implementation,
    /// A declaration-only file (`.d.ts`) describing ambient types.
    Declaration,
}

impl SourceKind {
    /// Detect the source kind from a file path.
    ///
    /// # Examples
    /// ```
    /// use std::path::Path;
    /// use closurize_core::SourceKind;
    ///
    /// assert_eq!(SourceKind::from_path(Path::new("a/b.d.ts")), Some(SourceKind::Declaration));
    /// assert_eq!(SourceKind::from_path(Path::new("a/b.ts")), Some(SourceKind::Implementation));
    /// assert_eq!(SourceKind::from_path(Path::new("a/b.css")), None);
    /// ```
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".d.ts") {
            Some(Self::Declaration)
        } else if name.ends_with(".ts") || name.ends_with(".tsx") {
            Some(Self::Implementation)
        } else {
            None
        }
    }
}

// ============================================================================
// Module Format
// ============================================================================

/// Output module format selected by the host.
///
/// Typedef re-exports (`exports.T`) are only emitted when the selected
/// format matches [`ModuleFormat::TARGET`]; emitting them under another
/// format is a policy decision left to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModuleFormat {
    #[default]
    CommonJs,
    EsModule,
}

impl ModuleFormat {
    /// The format the typedef emission path targets.
    pub const TARGET: ModuleFormat = ModuleFormat::CommonJs;

    /// Parse a format name from CLI/API input.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "commonjs" | "cjs" => Some(Self::CommonJs),
            "esm" | "esmodule" | "es" => Some(Self::EsModule),
            _ => None,
        }
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Error,
    Warning,
}

/// A per-file, per-node problem report.
///
/// Hard errors never abort a file: the visitors record a diagnostic and
/// continue with best-effort output. The driver inspects the accumulated
/// list after each file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Path of the file the diagnostic belongs to.
    pub file: String,
    /// Byte offset of the offending node.
    pub start: usize,
    /// Byte length of the offending node.
    pub length: usize,
    /// Human-readable message.
    pub message_text: String,
    pub category: Category,
    /// Always 0; reserved for host-side numbering.
    pub code: u32,
}

impl Diagnostic {
    pub fn error(file: &str, start: usize, length: usize, message: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            start,
            length,
            message_text: message.into(),
            category: Category::Error,
            code: 0,
        }
    }

    pub fn warning(file: &str, start: usize, length: usize, message: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            start,
            length,
            message_text: message.into(),
            category: Category::Warning,
            code: 0,
        }
    }
}

// ============================================================================
// Host Contract
// ============================================================================

/// Driver-supplied environment for a translation run.
///
/// ARCHITECTURE: This is the narrow seam between the core and the on-disk
/// driver. Everything the translator needs to know about module naming and
/// type policy flows through here; the core never touches the filesystem.
pub trait TranslatorHost {
    /// Compute the canonical cross-module name for a target module.
    /// Pure function of the two paths.
    fn path_to_module_name(&self, importer_path: &str, imported_path: &str) -> String;

    /// When true, rewrite trailing "/index" in import paths explicitly.
    fn convert_index_import_shorthand(&self) -> bool {
        false
    }

    /// Source paths whose declared types must be rendered as `?`.
    fn type_blacklist_paths(&self) -> &HashSet<String>;

    /// Force every emitted type string to `?`.
    fn untyped(&self) -> bool {
        false
    }

    /// Do not rewrite quotes around property accesses of indexable types.
    fn disable_auto_quoting(&self) -> bool {
        false
    }

    /// Output module format; gates typedef re-export emission.
    fn module_format(&self) -> ModuleFormat {
        ModuleFormat::default()
    }

    /// Whether non-actionable debug warnings should be recorded at all.
    fn accepts_warnings(&self) -> bool {
        false
    }

    /// Callback for non-fatal warnings.
    fn log_warning(&self, _diagnostic: &Diagnostic) {}
}

/// Concrete [`TranslatorHost`] used by the CLI and the test-suite.
///
/// Module names are derived from paths: extension stripped, leading `./`
/// dropped, path separators turned into dots, and dashes into underscores.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub type_blacklist_paths: HashSet<String>,
    pub untyped: bool,
    pub convert_index_import_shorthand: bool,
    pub disable_auto_quoting: bool,
    pub module_format: ModuleFormat,
    pub log_warnings: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: force all type strings to `?`.
    pub fn untyped(mut self, untyped: bool) -> Self {
        self.untyped = untyped;
        self
    }

    /// Builder: set the output module format.
    pub fn module_format(mut self, format: ModuleFormat) -> Self {
        self.module_format = format;
        self
    }

    /// Builder: blacklist a source path.
    pub fn blacklist_path(mut self, path: impl Into<String>) -> Self {
        self.type_blacklist_paths.insert(path.into());
        self
    }

    /// Builder: record debug warnings as diagnostics.
    pub fn log_warnings(mut self, log: bool) -> Self {
        self.log_warnings = log;
        self
    }
}

impl TranslatorHost for Options {
    fn path_to_module_name(&self, _importer_path: &str, imported_path: &str) -> String {
        let mut path = imported_path.trim_start_matches("./");
        for ext in [".d.ts", ".tsx", ".ts", ".js"] {
            if let Some(stripped) = path.strip_suffix(ext) {
                path = stripped;
                break;
            }
        }
        path.replace(['/', '\\'], ".").replace('-', "_")
    }

    fn convert_index_import_shorthand(&self) -> bool {
        self.convert_index_import_shorthand
    }

    fn type_blacklist_paths(&self) -> &HashSet<String> {
        &self.type_blacklist_paths
    }

    fn untyped(&self) -> bool {
        self.untyped
    }

    fn disable_auto_quoting(&self) -> bool {
        self.disable_auto_quoting
    }

    fn module_format(&self) -> ModuleFormat {
        self.module_format
    }

    fn accepts_warnings(&self) -> bool {
        self.log_warnings
    }
}

// ============================================================================
// Output Types
// ============================================================================

/// Result of annotating one implementation file.
#[derive(Debug, Clone)]
pub struct AnnotatedSource {
    /// The rewritten source text in the annotation dialect.
    pub content: String,
    /// Problems encountered while rewriting; never aborts the file.
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of generating externs for one declaration file.
#[derive(Debug, Clone)]
pub struct Externs {
    /// Flat namespaced stub text.
    pub content: String,
    pub diagnostics: Vec<Diagnostic>,
}

// ============================================================================
// Error Types
// ============================================================================

/// Error types for Closurize operations
///
/// ARCHITECTURE: Using thiserror for ergonomic error handling.
/// All library functions return Result<T, ClosurizeError>.
/// NO panics allowed in library code (enforced by clippy lints).
#[derive(Debug, Error)]
pub enum ClosurizeError {
    /// Source kind could not be detected from the file path
    #[error("Unsupported source file: {0}")]
    UnsupportedSource(PathBuf),

    /// tree-sitter failed to parse source code
    #[error("Failed to parse source code: {0}")]
    ParseError(String),

    /// tree-sitter language loading error
    #[error("Tree-sitter language error: {0}")]
    TreeSitterError(#[from] tree_sitter::LanguageError),

    /// A byte-range edit could not be spliced into the source
    #[error("Rewrite error: {0}")]
    RewriteError(String),

    /// A file index passed to the API does not exist in the program
    #[error("Unknown file id: {0}")]
    UnknownFile(usize),

    /// File I/O error (NOTE: should only occur in the CLI, not core)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

/// Result type alias for Closurize operations
pub type Result<T> = std::result::Result<T, ClosurizeError>;

// ============================================================================
// Parser Types
// ============================================================================

/// Wrapper around the tree-sitter parser for the typed dialect.
///
/// ARCHITECTURE: Parser is injected, not global. This struct is the only
/// place a grammar is loaded.
pub struct Parser {
    tree_sitter_parser: tree_sitter::Parser,
}

impl Parser {
    /// Create a parser for the typed TypeScript dialect.
    ///
    /// # Errors
    /// Returns `ClosurizeError::TreeSitterError` if the grammar fails to load.
    pub fn new() -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())?;
        Ok(Self {
            tree_sitter_parser: parser,
        })
    }

    /// Parse source code into a syntax tree.
    ///
    /// Tree-sitter is error-tolerant; malformed input still yields a tree
    /// with error nodes rather than failing outright.
    ///
    /// # Errors
    /// Returns `ClosurizeError::ParseError` if parsing produced no tree.
    pub fn parse(&mut self, source: &str) -> Result<tree_sitter::Tree> {
        self.tree_sitter_parser
            .parse(source, None)
            .ok_or_else(|| ClosurizeError::ParseError("Failed to parse source".to_string()))
    }
}

// ============================================================================
// Type Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_from_path() {
        assert_eq!(
            SourceKind::from_path(Path::new("src/app.ts")),
            Some(SourceKind::Implementation)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("src/app.d.ts")),
            Some(SourceKind::Declaration)
        );
        assert_eq!(SourceKind::from_path(Path::new("src/app.py")), None);
    }

    #[test]
    fn test_module_format_parse() {
        assert_eq!(ModuleFormat::parse("commonjs"), Some(ModuleFormat::CommonJs));
        assert_eq!(ModuleFormat::parse("ESM"), Some(ModuleFormat::EsModule));
        assert_eq!(ModuleFormat::parse("umd"), None);
    }

    #[test]
    fn test_path_to_module_name() {
        let options = Options::new();
        assert_eq!(
            options.path_to_module_name("src/a.ts", "./imported.ts"),
            "imported"
        );
        assert_eq!(
            options.path_to_module_name("src/a.ts", "src/foo-bar/baz.d.ts"),
            "src.foo_bar.baz"
        );
    }

    #[test]
    fn test_options_builder() {
        let options = Options::new()
            .untyped(true)
            .blacklist_path("vendor/opaque.ts")
            .module_format(ModuleFormat::EsModule);

        assert!(options.untyped);
        assert!(options.type_blacklist_paths.contains("vendor/opaque.ts"));
        assert_eq!(options.module_format, ModuleFormat::EsModule);
    }
}
