//! Central database of the session's source files.

use crate::file_id::FileId;
use crate::source_file::SourceFile;
use crate::span::Span;
use std::path::PathBuf;

/// Owns all registered source text and resolves spans to line numbers.
pub struct SourceDb {
    files: Vec<SourceFile>,
}

impl SourceDb {
    /// Creates an empty source database.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Adds a source file from an in-memory string, returning its [`FileId`].
    ///
    /// The `name` parameter is used as the file path in diagnostics.
    pub fn add_source(&mut self, name: impl Into<PathBuf>, content: String) -> FileId {
        let id = FileId::from_raw(self.files.len() as u32);
        self.files.push(SourceFile::new(id, name.into(), content));
        id
    }

    /// Returns the [`SourceFile`] for the given [`FileId`].
    ///
    /// # Panics
    ///
    /// Panics if the `FileId` is invalid.
    pub fn get_file(&self, id: FileId) -> &SourceFile {
        &self.files[id.as_raw() as usize]
    }

    /// Returns the 1-indexed first line number of a span, or `None` for
    /// dummy spans.
    ///
    /// The architecture chooser uses this for same-file tie-breaking.
    pub fn first_line(&self, span: Span) -> Option<u32> {
        if span.is_dummy() {
            return None;
        }
        Some(self.get_file(span.file).line_col(span.start).0)
    }

    /// Returns the source text corresponding to a [`Span`].
    pub fn snippet(&self, span: Span) -> &str {
        self.get_file(span.file).snippet(span.start, span.end)
    }
}

impl Default for SourceDb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get() {
        let mut db = SourceDb::new();
        let id = db.add_source("a.vhd", "architecture rtl of top is".to_string());
        assert_eq!(db.get_file(id).content, "architecture rtl of top is");
    }

    #[test]
    fn first_line_resolution() {
        let mut db = SourceDb::new();
        let id = db.add_source("a.vhd", "line1\nline2\nline3".to_string());
        assert_eq!(db.first_line(Span::new(id, 0, 5)), Some(1));
        assert_eq!(db.first_line(Span::new(id, 6, 11)), Some(2));
        assert_eq!(db.first_line(Span::DUMMY), None);
    }

    #[test]
    fn snippet() {
        let mut db = SourceDb::new();
        let id = db.add_source("a.vhd", "entity foo is end;".to_string());
        assert_eq!(db.snippet(Span::new(id, 7, 10)), "foo");
    }

    #[test]
    fn multiple_files() {
        let mut db = SourceDb::new();
        let a = db.add_source("a.vhd", "one".to_string());
        let b = db.add_source("b.vhd", "two".to_string());
        assert_ne!(a, b);
        assert_eq!(db.get_file(b).content, "two");
    }
}
