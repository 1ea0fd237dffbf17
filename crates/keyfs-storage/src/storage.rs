//! The storage adapter: CRUD, listing, stat, and locking over a [`KvEngine`].

use std::ops::ControlFlow;

use keyfs_engine::KvEngine;
use serde::Serialize;
use tracing::debug;

use crate::error::{Op, StorageError, StorageResult};
use crate::locks::{LockGuard, LockRegistry};
use crate::walk::{dir_prefix, Listing};

/// What [`Storage::stat`] knows about a key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub key: String,
    /// `true` for a stored entry, `false` for an inferred directory.
    pub is_terminal: bool,
    /// Engine-reported size of a stored entry's value; `None` for
    /// directories. This is an estimate, good for ordering but not accounting.
    pub size_estimate: Option<u64>,
}

impl KeyInfo {
    fn terminal(key: &str, size: u64) -> Self {
        Self {
            key: key.to_string(),
            is_terminal: true,
            size_estimate: Some(size),
        }
    }

    fn directory(key: &str) -> Self {
        Self {
            key: key.to_string(),
            is_terminal: false,
            size_estimate: None,
        }
    }
}

/// A hierarchical key namespace over a flat transactional engine.
///
/// Every method takes `&self`; share a `Storage` between threads with `Arc`.
pub struct Storage<E> {
    engine: E,
    locks: LockRegistry,
}

impl<E: KvEngine> Storage<E> {
    /// Wrap `engine` with a fresh lock registry.
    pub fn new(engine: E) -> Self {
        Self::with_locks(engine, LockRegistry::new())
    }

    /// Wrap `engine` with the given lock registry.
    pub fn with_locks(engine: E, locks: LockRegistry) -> Self {
        Self { engine, locks }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Block until no one else holds `key`, then hold it.
    pub fn lock(&self, key: &str) -> StorageResult<()> {
        require_key(key)?;
        self.locks.lock(key);
        Ok(())
    }

    /// Hold `key` if it is free. Returns whether it was taken.
    pub fn try_lock(&self, key: &str) -> StorageResult<bool> {
        require_key(key)?;
        Ok(self.locks.try_lock(key))
    }

    /// Like [`lock`](Self::lock), releasing when the guard is dropped.
    pub fn locked(&self, key: &str) -> StorageResult<LockGuard<'_>> {
        require_key(key)?;
        Ok(self.locks.guard(key))
    }

    /// Release `key`. Fails with `LockViolation` if it is not held.
    pub fn unlock(&self, key: &str) -> StorageResult<()> {
        require_key(key)?;
        self.locks.unlock(key)?;
        Ok(())
    }

    /// Create or overwrite the entry at `key`.
    pub fn store(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        require_key(key)?;
        self.engine
            .update(|txn| txn.put(key.as_bytes(), value))
            .map_err(StorageError::engine(Op::Store))?;
        debug!(key, bytes = value.len(), "stored");
        Ok(())
    }

    /// Read the entry at `key`.
    pub fn load(&self, key: &str) -> StorageResult<Vec<u8>> {
        let value = self
            .engine
            .view(|txn| txn.get(key.as_bytes()))
            .map_err(StorageError::engine(Op::Load))?;
        debug!(key, found = value.is_some(), "loaded");
        value.ok_or_else(|| StorageError::not_found(key))
    }

    /// Remove the entry at `key`. Fails with `NotFound` if there is none.
    pub fn delete(&self, key: &str) -> StorageResult<()> {
        require_key(key)?;
        let existed = self
            .engine
            .update(|txn| txn.remove(key.as_bytes()))
            .map_err(StorageError::engine(Op::Delete))?;
        debug!(key, existed, "deleted");
        if !existed {
            return Err(StorageError::not_found(key));
        }
        Ok(())
    }

    /// Whether an entry is stored at `key`. Engine failures read as `false`.
    pub fn exists(&self, key: &str) -> bool {
        self.engine
            .view(|txn| txn.value_size(key.as_bytes()))
            .map(|size| size.is_some())
            .unwrap_or(false)
    }

    /// List the children of the directory `prefix`.
    ///
    /// Non-recursive listings return the first segment below `prefix` of every
    /// key under it; recursive listings return every segment. Each path appears
    /// once, in the order it was first reached while scanning keys in engine
    /// order. Fails with `NotFound` when nothing is stored under `prefix + "/"`.
    pub fn list(&self, prefix: &str, recursive: bool) -> StorageResult<Vec<String>> {
        let dir = dir_prefix(prefix);
        let mut listing = Listing::new(&dir, recursive);
        let matched = self
            .engine
            .view(|txn| {
                let mut matched = false;
                txn.scan_prefix(dir.as_bytes(), &mut |key| {
                    matched = true;
                    listing.add(key);
                    ControlFlow::Continue(())
                })?;
                Ok(matched)
            })
            .map_err(StorageError::engine(Op::List))?;
        if !matched {
            return Err(StorageError::not_found(prefix));
        }
        debug!(prefix, recursive, entries = listing.len(), "listed");
        Ok(listing.into_entries())
    }

    /// Describe `key` as a stored entry or an inferred directory.
    ///
    /// A stored entry wins over descendants sharing its name. Fails with
    /// `NotFound` when `key` is neither.
    pub fn stat(&self, key: &str) -> StorageResult<KeyInfo> {
        let info = self
            .engine
            .view(|txn| {
                if let Some(size) = txn.value_size(key.as_bytes())? {
                    return Ok(Some(KeyInfo::terminal(key, size)));
                }
                let dir = dir_prefix(key);
                Ok(txn
                    .has_prefix(dir.as_bytes())?
                    .then(|| KeyInfo::directory(key)))
            })
            .map_err(StorageError::engine(Op::Stat))?;
        debug!(key, found = info.is_some(), "stat");
        info.ok_or_else(|| StorageError::not_found(key))
    }
}

impl<E: std::fmt::Debug> std::fmt::Debug for Storage<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("engine", &self.engine)
            .field("locks_held", &self.locks.len())
            .finish()
    }
}

fn require_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason: "key must not be empty".into(),
        });
    }
    Ok(())
}
