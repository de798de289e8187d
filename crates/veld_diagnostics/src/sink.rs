//! Diagnostic accumulator with the elaboration hint stack.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Accumulates diagnostics emitted during elaboration.
///
/// The error count is tracked atomically so phase gates can check
/// [`error_count`](Self::error_count) without locking the diagnostic vector.
///
/// The sink also owns the hint stack: while a hint is pushed, every emitted
/// diagnostic receives it as a trailing note. Hints are pushed around lowering
/// so that errors surfaced there still report the originating instance; the
/// pop must happen on all exit paths, which callers get from
/// [`HintGuard`](Self::hint_scope).
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    hints: Mutex<Vec<String>>,
    error_count: AtomicUsize,
}

impl DiagnosticSink {
    /// Creates a new empty diagnostic sink.
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            hints: Mutex::new(Vec::new()),
            error_count: AtomicUsize::new(0),
        }
    }

    /// Emits a diagnostic, attaching any active hints as notes.
    pub fn emit(&self, mut diag: Diagnostic) {
        {
            let hints = self.hints.lock().unwrap();
            for hint in hints.iter() {
                diag.notes.push(hint.clone());
            }
        }
        if diag.severity == Severity::Error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.diagnostics.lock().unwrap().push(diag);
    }

    /// Pushes a hint and returns a guard that pops it when dropped.
    pub fn hint_scope(&self, hint: impl Into<String>) -> HintGuard<'_> {
        self.hints.lock().unwrap().push(hint.into());
        HintGuard { sink: self }
    }

    /// Returns `true` if any error-severity diagnostics have been emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) > 0
    }

    /// Returns the number of error-severity diagnostics emitted so far.
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Takes all accumulated diagnostics, leaving the sink empty.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock().unwrap())
    }

    /// Returns a snapshot of all accumulated diagnostics without draining.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap().clone()
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Pops one hint from the owning sink on drop.
pub struct HintGuard<'a> {
    sink: &'a DiagnosticSink,
}

impl Drop for HintGuard<'_> {
    fn drop(&mut self) {
        self.sink.hints.lock().unwrap().pop();
    }
}
