//! A file-system-shaped view over a flat key-value engine.
//!
//! Callers address data with `/`-delimited keys such as
//! `certificates/acme/example.com/example.com.crt`. The engine underneath has
//! no notion of directories; this crate infers them from key prefixes.
//!
//! # Modules
//!
//! - [`walk`]: derives the directory segments of a key (no I/O)
//! - [`locks`]: named advisory locks
//! - [`storage`]: [`Storage`], the Store/Load/Delete/Exists/List/Stat/Lock surface
//! - [`config`]: TOML configuration and engine wiring
//! - [`error`]: error types
//!
//! # Consistency
//!
//! Each operation runs in a single engine transaction. `list` and `stat` see a
//! snapshot taken when they start and are not linearizable with concurrent
//! `store`/`delete` calls: a listing may miss or include an entry that is being
//! written at the same moment.
//!
//! Locks are advisory. They only exclude callers that also take them.

pub mod config;
pub mod error;
pub mod locks;
pub mod storage;
pub mod walk;

pub use config::{ConfigError, StorageConfig};
pub use error::{Op, StorageError, StorageResult};
pub use locks::{LockError, LockGuard, LockRegistry};
pub use storage::{KeyInfo, Storage};
pub use walk::{list_children, walk_key, Listing, Segments};
