//! Structured diagnostics for the veld elaboration core.
//!
//! Elaboration reports user-input problems as [`Diagnostic`]s accumulated in
//! a [`DiagnosticSink`]; the recursion continues past most errors up to the
//! next phase gate. The sink also owns the elaboration hint stack: hints
//! pushed while lowering an instance are attached to every diagnostic emitted
//! while active, so errors surfaced deep in lowering still name the
//! originating instance.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod label;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use label::{Label, LabelStyle};
pub use severity::Severity;
pub use sink::DiagnosticSink;
