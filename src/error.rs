//! Error types for pool configuration and submission.
//!
//! Errors are explicit and typed. There are deliberately few of them:
//! configuration faults surface at construction, and the only runtime
//! failure a caller can observe from `submit` is a submission racing
//! shutdown. Panics inside submitted tasks are swallowed by the worker
//! loop; panics inside cooperative task bodies are captured in the task
//! and re-raised when awaited.

use std::fmt;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad constructor arguments: zero workers, `min > max`, or a kind that
    /// does not match the constructor.
    InvalidConfig,
    /// `submit` was called after the pool began shutting down.
    SubmitAfterShutdown,
}

/// The error type for pool operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    context: Option<String>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Adds context text to the error.
    #[must_use]
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(ctx) = &self.context {
            write!(f, ": {ctx}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// A specialized Result type for pool operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_context() {
        let err = Error::new(ErrorKind::InvalidConfig).with_context("min must not exceed max");
        let text = err.to_string();
        assert!(text.contains("InvalidConfig"));
        assert!(text.contains("min must not exceed max"));
    }

    #[test]
    fn kind_is_preserved() {
        let err = Error::new(ErrorKind::SubmitAfterShutdown);
        assert_eq!(err.kind(), ErrorKind::SubmitAfterShutdown);
    }
}
