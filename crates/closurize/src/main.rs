//! closurize CLI - Command-line interface for closurize-core
//!
//! ARCHITECTURE: Thin I/O layer over the closurize-core library.
//! This binary handles:
//! - File discovery (directories walked with ignore-file support)
//! - File I/O (parallel reads via rayon)
//! - CLI argument parsing (clap)
//! - Output placement (stdout or an output directory)
//! - Diagnostic rendering (colored stderr, or JSON lines)
//! - Process exit codes

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;

use closurize_core::{
    annotate, generate_externs, Category, Diagnostic, ModuleFormat, Options, Program, SourceKind,
};

/// Maximum input size per file to prevent memory exhaustion (50MB)
const MAX_INPUT_SIZE: usize = 50 * 1024 * 1024;

/// Maximum number of parallel jobs (threads) to prevent resource exhaustion
const MAX_JOBS: usize = 128;

/// closurize - TypeScript to Closure-annotated JavaScript
///
/// Rewrite typed sources into plain JavaScript carrying its type
/// information in structured comments, and print externs stubs for
/// declaration files.
#[derive(Parser, Debug)]
#[command(name = "closurize")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:\n  \
    closurize src/app.ts                  Annotate one file to stdout\n  \
    closurize src/ -o build/              Annotate a tree into build/\n  \
    closurize src/ --externs build/externs.js   Collect externs from .d.ts files\n  \
    closurize src/app.ts --untyped        Emit {?} for every type\n  \
    closurize src/ --json 2>diags.jsonl   Machine-readable diagnostics\n\n\
For more info: https://github.com/dean0x/closurize")]
struct Args {
    /// Files or directories to process
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Output directory for annotated .js files (default: stdout)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Write the collected externs stub to this file
    #[arg(long, value_name = "FILE")]
    externs: Option<PathBuf>,

    /// Emit {?} for every type
    #[arg(long)]
    untyped: bool,

    /// Output module format (gates typedef re-exports)
    #[arg(long, value_enum, default_value = "commonjs")]
    module_format: ModuleFormatArg,

    /// Rewrite trailing "/index" in import paths explicitly
    #[arg(long)]
    index_shorthand: bool,

    /// Number of parallel jobs for file reading (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Emit diagnostics as JSON lines on stderr
    #[arg(long)]
    json: bool,

    /// Record non-actionable debug warnings as diagnostics
    #[arg(long)]
    warnings: bool,
}

/// Module format argument (clap value_enum wrapper)
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModuleFormatArg {
    Commonjs,
    Esm,
}

impl From<ModuleFormatArg> for ModuleFormat {
    fn from(arg: ModuleFormatArg) -> Self {
        match arg {
            ModuleFormatArg::Commonjs => ModuleFormat::CommonJs,
            ModuleFormatArg::Esm => ModuleFormat::EsModule,
        }
    }
}

/// Diagnostic shape for --json output
#[derive(Debug, Serialize)]
struct JsonDiagnostic<'a> {
    file: &'a str,
    start: usize,
    length: usize,
    line: usize,
    col: usize,
    category: &'a str,
    message: &'a str,
}

fn main() {
    let args = Args::parse();
    match run(&args) {
        Ok(had_errors) => {
            if had_errors {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(2);
        }
    }
}

fn run(args: &Args) -> anyhow::Result<bool> {
    let paths = discover_files(&args.paths)?;
    if paths.is_empty() {
        anyhow::bail!("no TypeScript sources found in the given paths");
    }

    let inputs = read_files(paths, args.jobs)?;
    let program = Program::parse(inputs).context("failed to parse program")?;

    let host = Options {
        untyped: args.untyped,
        module_format: args.module_format.into(),
        convert_index_import_shorthand: args.index_shorthand,
        log_warnings: args.warnings,
        ..Options::default()
    };

    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    let mut externs_out = String::new();
    let mut had_errors = false;

    for file in 0..program.file_count() {
        let Some(source_file) = program.file(file) else {
            continue;
        };
        let path = source_file.path.clone();
        let kind = source_file.kind;
        let source = source_file.source.clone();

        match kind {
            SourceKind::Implementation => {
                let result = annotate(&program, file, &host)
                    .with_context(|| format!("failed to annotate {path}"))?;
                had_errors |= report_diagnostics(&result.diagnostics, &source, args.json);
                write_output(&mut writer, args.output.as_deref(), &path, &result.content)?;
            }
            SourceKind::Declaration => {
                let result = generate_externs(&program, file, &host)
                    .with_context(|| format!("failed to generate externs for {path}"))?;
                had_errors |= report_diagnostics(&result.diagnostics, &source, args.json);
                if !result.content.is_empty() {
                    externs_out.push_str(&format!("// externs from {path}\n"));
                    externs_out.push_str(&result.content);
                }
            }
        }
    }

    if !externs_out.is_empty() {
        let content = format!("/** @externs */\n{externs_out}");
        match (&args.externs, &args.output) {
            (Some(path), _) => {
                fs::write(path, &content)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            (None, Some(dir)) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
                let path = dir.join("externs.js");
                fs::write(&path, &content)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            (None, None) => {
                write!(writer, "{content}")?;
            }
        }
    }

    writer.flush()?;
    Ok(had_errors)
}

/// Collect .ts/.tsx/.d.ts files from the given paths, walking directories
/// with ignore-file support.
fn discover_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            anyhow::bail!("no such file or directory: {}", path.display());
        }
        for entry in WalkBuilder::new(path).build() {
            let entry = entry?;
            let p = entry.path();
            if p.is_file() && SourceKind::from_path(p).is_some() {
                files.push(p.to_path_buf());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Read all inputs, in parallel when there are several.
fn read_files(
    paths: Vec<PathBuf>,
    jobs: Option<usize>,
) -> anyhow::Result<Vec<(String, String)>> {
    let read_one = |path: &Path| -> anyhow::Result<(String, String)> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        if contents.len() > MAX_INPUT_SIZE {
            anyhow::bail!(
                "file too large: {} bytes exceeds maximum of {} bytes ({}MB): {}",
                contents.len(),
                MAX_INPUT_SIZE,
                MAX_INPUT_SIZE / 1024 / 1024,
                path.display()
            );
        }
        Ok((path.to_string_lossy().into_owned(), contents))
    };

    if let Some(num_jobs) = jobs {
        let num_jobs = num_jobs.clamp(1, MAX_JOBS);
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_jobs)
            .build()?
            .install(|| paths.par_iter().map(|p| read_one(p)).collect())
    } else {
        paths.par_iter().map(|p| read_one(p)).collect()
    }
}

fn write_output(
    writer: &mut impl Write,
    output_dir: Option<&Path>,
    source_path: &str,
    content: &str,
) -> anyhow::Result<()> {
    match output_dir {
        Some(dir) => {
            let stem = Path::new(source_path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "out".to_string());
            let path = dir.join(format!("{stem}.js"));
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            fs::write(&path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            write!(writer, "{content}")?;
        }
    }
    Ok(())
}

/// Print diagnostics to stderr; returns true when any is an error.
fn report_diagnostics(diagnostics: &[Diagnostic], source: &str, json: bool) -> bool {
    let mut had_errors = false;
    for d in diagnostics {
        let (line, col) = line_col(source, d.start);
        if d.category == Category::Error {
            had_errors = true;
        }
        if json {
            let payload = JsonDiagnostic {
                file: &d.file,
                start: d.start,
                length: d.length,
                line,
                col,
                category: match d.category {
                    Category::Error => "error",
                    Category::Warning => "warning",
                },
                message: &d.message_text,
            };
            match serde_json::to_string(&payload) {
                Ok(s) => eprintln!("{s}"),
                Err(e) => eprintln!("failed to serialize diagnostic: {e}"),
            }
        } else {
            let label = match d.category {
                Category::Error => "error:".red().bold(),
                Category::Warning => "warning:".yellow().bold(),
            };
            eprintln!("{}:{line}:{col}: {label} {}", d.file, d.message_text);
        }
    }
    had_errors
}

/// 1-based line and column of a byte offset.
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let col = before
        .rfind('\n')
        .map(|i| offset - i)
        .unwrap_or(offset + 1);
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let source = "abc\ndef\nghi";
        assert_eq!(line_col(source, 0), (1, 1));
        assert_eq!(line_col(source, 5), (2, 2));
        assert_eq!(line_col(source, 8), (3, 1));
    }
}
