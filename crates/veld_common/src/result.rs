//! Result and error types for core invariant violations.

/// The result type for operations that can hit a core invariant violation.
///
/// `Err` means a bug in veld itself (the moral equivalent of an unreachable
/// arm in a kind dispatch), never bad user input. User-input problems are
/// reported through the diagnostic sink and the operation still returns `Ok`
/// with a possibly degraded value.
pub type VeldResult<T> = Result<T, InternalError>;

/// An internal elaboration error: a tree or Verilog node appeared in a place
/// the core's invariants say it cannot.
#[derive(Debug, thiserror::Error)]
#[error("internal elaboration error: {message}")]
pub struct InternalError {
    /// Description of the violated invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("unexpected node kind in binding");
        assert_eq!(
            format!("{err}"),
            "internal elaboration error: unexpected node kind in binding"
        );
    }

    #[test]
    fn from_string() {
        let err: InternalError = "bad prefix order".to_string().into();
        assert_eq!(err.message, "bad prefix order");
    }
}
