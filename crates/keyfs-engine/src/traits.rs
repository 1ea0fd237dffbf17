//! The engine seam: [`KvEngine`] plus the transaction views it lends out.

use std::ops::ControlFlow;

use crate::error::EngineResult;

/// A consistent read view over the key space.
///
/// Object-safe so the storage layer can hold it as `&dyn ReadTxn` regardless
/// of which engine produced it.
pub trait ReadTxn {
    /// Read the value at `key`, copied out of the engine.
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Size of the value at `key` without copying it.
    ///
    /// Engines may return an estimate; callers must only use it for ordering.
    fn value_size(&self, key: &[u8]) -> EngineResult<Option<u64>>;

    /// Visit every key starting with `prefix`, in key order.
    ///
    /// Returning `ControlFlow::Break` from `visit` ends the scan early.
    fn scan_prefix(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8]) -> ControlFlow<()>,
    ) -> EngineResult<()>;

    /// Whether at least one key starts with `prefix`.
    fn has_prefix(&self, prefix: &[u8]) -> EngineResult<bool> {
        let mut found = false;
        self.scan_prefix(prefix, &mut |_| {
            found = true;
            ControlFlow::Break(())
        })?;
        Ok(found)
    }
}

/// A write view. Reads through it observe its own uncommitted writes.
pub trait WriteTxn: ReadTxn {
    /// Create or overwrite the entry at `key`.
    fn put(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()>;

    /// Remove the entry at `key`. Returns `true` if an entry existed.
    fn remove(&mut self, key: &[u8]) -> EngineResult<bool>;
}

/// A transactional key-value engine.
///
/// Implementations must be thread-safe. Each `view` or `update` call is one
/// transaction; nothing is promised about isolation between two calls.
pub trait KvEngine: Send + Sync {
    /// Run `f` against a read view. The view is released when this returns.
    fn view<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&dyn ReadTxn) -> EngineResult<T>;

    /// Run `f` against a write view.
    ///
    /// Writes made by `f` are committed together if it returns `Ok` and
    /// discarded if it returns `Err`.
    fn update<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> EngineResult<T>;
}
