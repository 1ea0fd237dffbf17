//! Runtime engine selection.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::memory::InMemoryEngine;
use crate::redb_engine::RedbEngine;
use crate::traits::{KvEngine, ReadTxn, WriteTxn};

/// Which engine to open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// redb database file.
    #[default]
    Redb,
    /// Process-local map; contents are lost on exit.
    Memory,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Redb => write!(f, "redb"),
            EngineKind::Memory => write!(f, "memory"),
        }
    }
}

/// An engine chosen at runtime, e.g. from configuration.
#[derive(Debug)]
pub enum AnyEngine {
    Memory(InMemoryEngine),
    Redb(RedbEngine),
}

impl AnyEngine {
    /// Open an engine of the given kind. `path` is ignored for `Memory`.
    pub fn open(kind: EngineKind, path: &Path) -> EngineResult<Self> {
        match kind {
            EngineKind::Memory => Ok(AnyEngine::Memory(InMemoryEngine::new())),
            EngineKind::Redb => Ok(AnyEngine::Redb(RedbEngine::open(path)?)),
        }
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            AnyEngine::Memory(_) => EngineKind::Memory,
            AnyEngine::Redb(_) => EngineKind::Redb,
        }
    }
}

impl From<InMemoryEngine> for AnyEngine {
    fn from(engine: InMemoryEngine) -> Self {
        AnyEngine::Memory(engine)
    }
}

impl From<RedbEngine> for AnyEngine {
    fn from(engine: RedbEngine) -> Self {
        AnyEngine::Redb(engine)
    }
}

impl KvEngine for AnyEngine {
    fn view<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&dyn ReadTxn) -> EngineResult<T>,
    {
        match self {
            AnyEngine::Memory(engine) => engine.view(f),
            AnyEngine::Redb(engine) => engine.view(f),
        }
    }

    fn update<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> EngineResult<T>,
    {
        match self {
            AnyEngine::Memory(engine) => engine.update(f),
            AnyEngine::Redb(engine) => engine.update(f),
        }
    }
}
