//! Byte-range edit splicing
//!
//! ARCHITECTURE: The annotation transformer never mutates a syntax tree;
//! it records byte-range edits against the original source and splices
//! them in one pass at the end. Runtime text outside the edited ranges is
//! preserved byte-for-byte.

use crate::{ClosurizeError, Result};

/// One replacement of a source byte range. `start == end` is an insertion.
#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// Accumulates edits during a traversal and splices them at the end.
#[derive(Debug, Default)]
pub struct Rewriter {
    edits: Vec<Edit>,
}

impl Rewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert text at a position, displacing nothing.
    pub fn insert(&mut self, pos: usize, text: impl Into<String>) {
        self.edits.push(Edit {
            start: pos,
            end: pos,
            text: text.into(),
        });
    }

    /// Replace a byte range with new text.
    pub fn replace(&mut self, start: usize, end: usize, text: impl Into<String>) {
        self.edits.push(Edit {
            start,
            end,
            text: text.into(),
        });
    }

    /// Remove a byte range.
    pub fn delete(&mut self, start: usize, end: usize) {
        self.replace(start, end, "");
    }

    /// Remove a byte range together with any whitespace that follows it,
    /// so deleted keywords do not leave double spaces behind.
    pub fn delete_with_trailing_space(&mut self, start: usize, end: usize, source: &str) {
        let mut end = end;
        while source[end..].starts_with(' ') || source[end..].starts_with('\t') {
            end += 1;
        }
        self.delete(start, end);
    }

    /// Apply the accumulated edits to the whole source.
    ///
    /// Edits are sorted by position (insertions before replacements at the
    /// same offset, both keeping insertion order); an edit overlapping an
    /// already-applied one is skipped; nested rewrites are resolved by
    /// whichever visitor claimed the outer range first.
    ///
    /// # Errors
    /// Returns `ClosurizeError::RewriteError` for ranges that exceed the
    /// source or fall on a non-UTF-8 boundary.
    pub fn apply(&self, source: &str) -> Result<String> {
        self.apply_range(source, 0, source.len())
    }

    /// Apply only the edits contained in `[start, end)` and return that
    /// slice's rewritten text. Used to rebuild sub-expressions when a
    /// statement is replaced wholesale.
    pub fn apply_range(&self, source: &str, start: usize, end: usize) -> Result<String> {
        let mut sorted: Vec<&Edit> = self
            .edits
            .iter()
            .filter(|e| e.start >= start && e.end <= end)
            .collect();
        // Insertions first at a given offset; then wider replacements, so
        // an outer rewrite shadows edits nested inside it.
        sorted.sort_by_key(|e| (e.start, usize::from(e.end != e.start), usize::MAX - e.end));

        let estimated = (end - start) + sorted.iter().map(|e| e.text.len()).sum::<usize>();
        let mut result = String::with_capacity(estimated);
        let mut last_pos = start;

        for edit in sorted {
            if edit.end < edit.start || edit.end > source.len() {
                return Err(ClosurizeError::RewriteError(format!(
                    "invalid edit range [{}, {})",
                    edit.start, edit.end
                )));
            }
            // Skip edits nested inside an already-applied replacement.
            if edit.start < last_pos {
                continue;
            }
            if !source.is_char_boundary(edit.start) || !source.is_char_boundary(edit.end) {
                return Err(ClosurizeError::RewriteError(format!(
                    "edit range [{}, {}) is not on a UTF-8 boundary",
                    edit.start, edit.end
                )));
            }
            result.push_str(&source[last_pos..edit.start]);
            result.push_str(&edit.text);
            last_pos = edit.end;
        }

        if !source.is_char_boundary(last_pos) || !source.is_char_boundary(end) {
            return Err(ClosurizeError::RewriteError(format!(
                "range end {last_pos} is not on a UTF-8 boundary"
            )));
        }
        result.push_str(&source[last_pos..end]);
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_splice_ordering() {
        let mut rw = Rewriter::new();
        rw.replace(4, 7, "world");
        rw.insert(0, ">> ");
        assert_eq!(rw.apply("hey foo!").unwrap(), ">> hey world!");
    }

    #[test]
    fn test_insert_before_replace_at_same_offset() {
        let mut rw = Rewriter::new();
        rw.replace(0, 3, "bar");
        rw.insert(0, "/* c */ ");
        assert_eq!(rw.apply("foo;").unwrap(), "/* c */ bar;");
    }

    #[test]
    fn test_nested_edit_is_skipped() {
        let mut rw = Rewriter::new();
        rw.replace(0, 8, "replaced");
        rw.delete(2, 4);
        assert_eq!(rw.apply("0123456789").unwrap(), "replaced89");
    }

    #[test]
    fn test_apply_range() {
        let source = "let x: T = f(y);";
        let mut rw = Rewriter::new();
        rw.delete(5, 8); // the ": T" annotation
        let out = rw.apply_range(source, 4, 15).unwrap();
        assert_eq!(out, "x = f(y)");
    }

    #[test]
    fn test_out_of_bounds_edit_errors() {
        let mut rw = Rewriter::new();
        rw.delete(2, 99);
        assert!(rw.apply("short").is_err());
    }
}
