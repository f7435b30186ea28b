//! Closurize Core - TypeScript to Closure-annotated JavaScript
//!
//! # Overview
//!
//! `closurize-core` is a pure library that rewrites statically typed
//! TypeScript-dialect sources into plain JavaScript whose type information
//! lives in structured block comments, ready for a type-aware optimizer.
//! Declaration-only input is printed as a flat externs stub instead.
//!
//! # Architecture
//!
//! **IMPORTANT: This is a LIBRARY with NO I/O.**
//! - Accepts `(path, source)` string pairs, not file handles
//! - Returns `Result<_>` values with per-file diagnostics, never exits
//! - Pure transformations, no side effects
//!
//! The CLI handles file discovery, parallelism, and output placement.
//!
//! # Example
//!
//! ```no_run
//! use closurize_core::{annotate_source, Options};
//!
//! let source = "class C { constructor(public x: number) {} }";
//! let out = annotate_source("c.ts", source, &Options::new())?;
//! assert!(out.content.contains("C.prototype.x;"));
//! # Ok::<(), closurize_core::ClosurizeError>(())
//! ```
//!
//! # Design Principles
//!
//! 1. **Byte-range splicing** - runtime code outside the rewritten ranges
//!    survives byte-for-byte
//! 2. **Result types everywhere** - NO panics (enforced by clippy)
//! 3. **Narrow seams** - the type checker and the driver sit behind the
//!    `Checker` and `TranslatorHost` traits

// Re-export core types for public API
pub use checker::binder::{Program, ProgramFile};
pub use checker::ty::{FunctionType, ParamType, RecordProperty, Type};
pub use checker::{Checker, DeclSite, FileId, Symbol, SymbolFlags, SymbolId};
pub use rewrite::Rewriter;
pub use translator::type_string::TypeTranslator;
pub use translator::{ForwardDeclare, ModuleTypeTranslator, MutableJsDoc};
pub use types::{
    AnnotatedSource, Category, ClosurizeError, Diagnostic, Externs, ModuleFormat, Options, Parser,
    Result, SourceKind, TranslatorHost,
};

pub mod jsdoc;

mod annotator;
mod checker;
mod externs;
mod parser;
mod rewrite;
mod translator;
mod types;

// ============================================================================
// Public API - Core Transformation Functions
// ============================================================================

/// Rewrite one implementation file of a program into the annotation
/// dialect.
///
/// Hard errors inside the file surface as diagnostics on the result, not
/// as `Err`: the output is always the best-effort rewrite.
///
/// # Errors
///
/// - `ClosurizeError::UnknownFile` - the file id is not in the program
/// - `ClosurizeError::UnsupportedSource` - the file is declaration-only
/// - `ClosurizeError::RewriteError` - an edit fell outside the source
pub fn annotate(
    program: &Program,
    file: FileId,
    host: &dyn TranslatorHost,
) -> Result<AnnotatedSource> {
    let source_file = program
        .file(file)
        .ok_or(ClosurizeError::UnknownFile(file))?;
    if source_file.kind != SourceKind::Implementation {
        return Err(ClosurizeError::UnsupportedSource(
            source_file.path.clone().into(),
        ));
    }
    let mtt = ModuleTypeTranslator::new(
        program,
        host,
        file,
        &source_file.path,
        &source_file.module_path,
        &source_file.source,
        false,
    );
    let content = annotator::annotate_source_file(&mtt, source_file.tree.root_node())?;
    Ok(AnnotatedSource {
        content,
        diagnostics: mtt.take_diagnostics(),
    })
}

/// Print the externs stub for one file of a program: every statement of a
/// declaration file, or only the `declare`d statements of an
/// implementation file.
///
/// # Errors
///
/// - `ClosurizeError::UnknownFile` - the file id is not in the program
pub fn generate_externs(
    program: &Program,
    file: FileId,
    host: &dyn TranslatorHost,
) -> Result<Externs> {
    let source_file = program
        .file(file)
        .ok_or(ClosurizeError::UnknownFile(file))?;
    let mtt = ModuleTypeTranslator::new(
        program,
        host,
        file,
        &source_file.path,
        &source_file.module_path,
        &source_file.source,
        true,
    );
    let is_declaration = source_file.kind == SourceKind::Declaration;
    let content =
        externs::generate_externs_content(&mtt, source_file.tree.root_node(), is_declaration);
    Ok(Externs {
        content,
        diagnostics: mtt.take_diagnostics(),
    })
}

/// Convenience wrapper: parse and annotate a single source file with the
/// bundled checker.
///
/// # Errors
///
/// All errors from [`Program::parse`] and [`annotate`].
pub fn annotate_source(
    path: &str,
    source: &str,
    host: &dyn TranslatorHost,
) -> Result<AnnotatedSource> {
    let program = Program::parse(vec![(path.to_string(), source.to_string())])?;
    annotate(&program, 0, host)
}

/// Convenience wrapper: parse a single declaration file and print its
/// externs with the bundled checker.
///
/// # Errors
///
/// All errors from [`Program::parse`] and [`generate_externs`].
pub fn externs_source(path: &str, source: &str, host: &dyn TranslatorHost) -> Result<Externs> {
    let program = Program::parse(vec![(path.to_string(), source.to_string())])?;
    generate_externs(&program, 0, host)
}

// ============================================================================
// Version Information
// ============================================================================

/// Get library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// Module Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Unwrapping is acceptable in tests
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_annotate_rejects_declaration_files() {
        let result = annotate_source("a.d.ts", "declare const x: number;", &Options::new());
        assert!(matches!(
            result,
            Err(ClosurizeError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn test_externs_accepts_both_kinds() {
        let host = Options::new();
        assert!(externs_source("a.d.ts", "declare const x: number;", &host).is_ok());
        let program = Program::parse(vec![(
            "b.ts".to_string(),
            "declare const y: string;\nconst z = 1;".to_string(),
        )])
        .unwrap();
        let externs = generate_externs(&program, 0, &host).unwrap();
        assert!(externs.content.contains("var y;"));
        assert!(!externs.content.contains('z'));
    }
}
