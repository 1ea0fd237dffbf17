//! Named advisory locks.
//!
//! A [`LockRegistry`] is a map of held names plus one condition variable.
//! `lock` waits until its name is absent from the map and inserts it, tagged
//! with a fresh acquisition number; `unlock` removes it and wakes the waiters.
//! A [`LockGuard`] remembers its acquisition number and releases only that.
//! Names are compared byte for byte and need not correspond to stored keys.
//!
//! Nothing times out and no deadlock detection is done. A holder that never
//! unlocks blocks every later `lock` of that name, and callers taking several
//! names must agree on an order themselves.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, warn};

/// Misuse of the lock API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Unlock of a name nobody holds (never locked, or already unlocked).
    #[error("lock not held: {key}")]
    NotHeld { key: String },
}

/// Held names, each tagged with the acquisition that took it.
#[derive(Debug, Default)]
struct Held {
    names: HashMap<String, u64>,
    next_generation: u64,
}

impl Held {
    fn take(&mut self, name: &str) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.names.insert(name.to_string(), generation);
        generation
    }
}

/// A registry of named mutexes.
///
/// Held state is tracked per name, not per thread: a name locked on one thread
/// may be unlocked from another.
#[derive(Debug, Default)]
pub struct LockRegistry {
    held: Mutex<Held>,
    released: Condvar,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self) -> MutexGuard<'_, Held> {
        // Poisoning means a panic while the map was being edited; the registry
        // can no longer say who holds what.
        self.held.lock().expect("lock registry poisoned")
    }

    fn acquire(&self, name: &str) -> u64 {
        let mut held = self.held();
        while held.names.contains_key(name) {
            held = self
                .released
                .wait(held)
                .expect("lock registry poisoned");
        }
        let generation = held.take(name);
        debug!(key = name, generation, "lock acquired");
        generation
    }

    /// Block until `name` is free, then take it.
    pub fn lock(&self, name: &str) {
        self.acquire(name);
    }

    /// Take `name` if it is free. Returns whether it was taken.
    pub fn try_lock(&self, name: &str) -> bool {
        let mut held = self.held();
        if held.names.contains_key(name) {
            return false;
        }
        let generation = held.take(name);
        debug!(key = name, generation, "lock acquired");
        true
    }

    /// Release `name`, whoever took it.
    pub fn unlock(&self, name: &str) -> Result<(), LockError> {
        let removed = self.held().names.remove(name).is_some();
        if !removed {
            return Err(LockError::NotHeld {
                key: name.to_string(),
            });
        }
        self.wake(name);
        Ok(())
    }

    /// Release `name` only if it is still held by acquisition `generation`.
    pub(crate) fn release(&self, name: &str, generation: u64) -> Result<(), LockError> {
        {
            let mut held = self.held();
            if held.names.get(name) != Some(&generation) {
                return Err(LockError::NotHeld {
                    key: name.to_string(),
                });
            }
            held.names.remove(name);
        }
        self.wake(name);
        Ok(())
    }

    fn wake(&self, name: &str) {
        // One condvar serves every name, so wake everyone and let each
        // waiter recheck its own.
        self.released.notify_all();
        debug!(key = name, "lock released");
    }

    /// Whether `name` is currently held.
    pub fn is_locked(&self, name: &str) -> bool {
        self.held().names.contains_key(name)
    }

    /// Number of names currently held.
    pub fn len(&self) -> usize {
        self.held().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until `name` is free, take it, and release it when the returned
    /// guard is dropped.
    ///
    /// The guard only releases the acquisition it made. If the name was
    /// unlocked and taken again in the meantime, dropping the guard leaves the
    /// new holder alone.
    pub fn guard(&self, name: &str) -> LockGuard<'_> {
        let generation = self.acquire(name);
        LockGuard {
            registry: self,
            name: name.to_string(),
            generation,
        }
    }
}

/// Holds a named lock until dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard<'a> {
    registry: &'a LockRegistry,
    name: String,
    generation: u64,
}

impl LockGuard<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.registry.release(&self.name, self.generation) {
            warn!(
                key = %self.name,
                generation = self.generation,
                error = %err,
                "lock guard dropped after its lock was released elsewhere"
            );
        }
    }
}
