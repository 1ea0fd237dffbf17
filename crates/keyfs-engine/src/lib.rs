//! Transactional key-value engines for keyfs.
//!
//! The storage layer never talks to a database directly. It asks a
//! [`KvEngine`] for a read view or a write view and does its work inside the
//! closure it hands over. Whatever the closure touched is released when the
//! call returns, and a write view commits only if the closure succeeds.
//!
//! # Engines
//!
//! - [`InMemoryEngine`] -- `BTreeMap` behind an `RwLock`, for tests and embedding
//! - [`RedbEngine`] -- redb database, on disk or in memory
//! - [`AnyEngine`] -- either of the above, chosen at runtime
//!
//! # Rules
//!
//! 1. Keys are raw bytes compared lexicographically; prefix scans walk them in order.
//! 2. Reads hand back private copies, never engine-owned buffers.
//! 3. A single `update` call is all-or-nothing.
//! 4. Absence is `Ok(None)` / `Ok(false)`, never an error.

pub mod any;
pub mod error;
pub mod memory;
pub mod redb_engine;
pub mod traits;

pub use any::{AnyEngine, EngineKind};
pub use error::{EngineError, EngineResult};
pub use memory::InMemoryEngine;
pub use redb_engine::RedbEngine;
pub use traits::{KvEngine, ReadTxn, WriteTxn};
