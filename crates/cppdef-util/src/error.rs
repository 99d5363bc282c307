//! Severity-coded parse failures.
//!
//! Diagnostics carry the human-readable story; [`DeclError`] only tells the
//! caller how to recover. The numeric statuses mirror the contract the
//! handlers expose: 1 means skip to the next statement terminator and keep
//! going, 3 means the name collided with a different kind of symbol, and 5
//! means the handler lost track of the input at this site.

use thiserror::Error;

/// Failure raised while handling a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeclError {
    /// Recoverable at the next statement terminator (status 1).
    #[error("recoverable declaration error")]
    Recoverable,

    /// Redeclaration conflicts with an existing symbol (status 3).
    #[error("redeclaration conflicts with an existing symbol")]
    Conflict,

    /// Unrecoverable at this site (status 5).
    #[error("unrecoverable error in declaration")]
    Unrecoverable,
}

impl DeclError {
    /// The numeric status code reported to embedders.
    pub fn status(self) -> i32 {
        match self {
            DeclError::Recoverable => 1,
            DeclError::Conflict => 3,
            DeclError::Unrecoverable => 5,
        }
    }
}

/// Result alias for declaration handling.
pub type DeclResult<T> = Result<T, DeclError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(DeclError::Recoverable.status(), 1);
        assert_eq!(DeclError::Conflict.status(), 3);
        assert_eq!(DeclError::Unrecoverable.status(), 5);
    }
}
