//! Error types for storage operations.

use keyfs_engine::EngineError;
use thiserror::Error;

use crate::locks::LockError;

/// The logical operation an engine failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Open,
    Store,
    Load,
    Delete,
    List,
    Stat,
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Op::Open => "open",
            Op::Store => "store",
            Op::Load => "load",
            Op::Delete => "delete",
            Op::List => "list",
            Op::Stat => "stat",
        };
        f.write_str(name)
    }
}

/// Errors returned by [`Storage`](crate::Storage).
#[derive(Debug, Error)]
pub enum StorageError {
    /// No entry at the key, or no entry under the prefix.
    #[error("key not found: {key}")]
    NotFound { key: String },

    /// Unlock of a name that is not locked.
    #[error(transparent)]
    LockViolation(#[from] LockError),

    /// The key is not acceptable for this operation.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The engine failed.
    #[error("{op}: {source}")]
    Engine {
        op: Op,
        #[source]
        source: EngineError,
    },
}

impl StorageError {
    pub(crate) fn not_found(key: &str) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    pub(crate) fn engine(op: Op) -> impl FnOnce(EngineError) -> Self {
        move |source| Self::Engine { op, source }
    }

    /// Whether this error means "nothing there".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn engine_error_names_the_operation() {
        let err = StorageError::engine(Op::List)(EngineError::Backend("io".into()));
        assert_eq!(err.to_string(), "list: backend error: io");
        assert!(err.source().is_some());
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_is_distinguishable() {
        let err = StorageError::not_found("acme/missing");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "key not found: acme/missing");
    }

    #[test]
    fn lock_error_converts() {
        let err: StorageError = LockError::NotHeld { key: "x".into() }.into();
        assert!(matches!(err, StorageError::LockViolation(_)));
        assert_eq!(err.to_string(), "lock not held: x");
    }
}
