//! Source location tracking for the veld elaboration core.
//!
//! Design units, tree nodes, and diagnostics all carry byte-offset [`Span`]s.
//! The [`SourceDb`] resolves spans to line/column coordinates; the
//! architecture chooser uses line numbers for same-file tie-breaking.

#![warn(missing_docs)]

pub mod file_id;
pub mod source_db;
pub mod source_file;
pub mod span;

pub use file_id::FileId;
pub use source_db::SourceDb;
pub use source_file::SourceFile;
pub use span::Span;
