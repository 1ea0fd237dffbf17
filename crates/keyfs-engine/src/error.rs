/// Errors raised by a key-value engine.
///
/// "Key not present" is not an error at this level; engines report it as
/// `Ok(None)` and leave the decision to the caller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The backing database rejected or failed the operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// A thread panicked while holding the engine's internal lock.
    #[error("engine lock poisoned")]
    Poisoned,

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
