use std::path::{Path, PathBuf};

use keyfs_engine::{AnyEngine, EngineKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::{Op, StorageError, StorageResult};
use crate::storage::Storage;

/// Errors reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which engine backs a [`Storage`] and where it keeps its data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub engine: EngineKind,
    /// Database file for the redb engine. Unused by `memory`.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Redb,
            path: PathBuf::from("keyfs.redb"),
        }
    }
}

impl StorageConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Open the configured engine and wrap it in a [`Storage`].
    pub fn open(&self) -> StorageResult<Storage<AnyEngine>> {
        debug!(engine = %self.engine, path = %self.path.display(), "opening storage");
        let engine =
            AnyEngine::open(self.engine, &self.path).map_err(StorageError::engine(Op::Open))?;
        Ok(Storage::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StorageConfig::default();
        assert_eq!(config.engine, EngineKind::Redb);
        assert_eq!(config.path, PathBuf::from("keyfs.redb"));
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(StorageConfig::from_toml_str("").unwrap(), StorageConfig::default());
    }

    #[test]
    fn parse_memory_engine() {
        let config = StorageConfig::from_toml_str("engine = \"memory\"").unwrap();
        assert_eq!(config.engine, EngineKind::Memory);
        assert_eq!(config.path, PathBuf::from("keyfs.redb"));
    }

    #[test]
    fn unknown_engine_is_rejected() {
        let err = StorageConfig::from_toml_str("engine = \"sled\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_missing_file_names_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = StorageConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn load_and_open_redb() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("certs.redb");
        let file = dir.path().join("keyfs.toml");
        let text = format!("engine = \"redb\"\npath = {:?}\n", db.display().to_string());
        std::fs::write(&file, text).unwrap();

        let config = StorageConfig::load(&file).unwrap();
        assert_eq!(config.path, db);

        let storage = config.open().unwrap();
        storage.store("a/b", b"1").unwrap();
        drop(storage);

        let reopened = config.open().unwrap();
        assert_eq!(reopened.load("a/b").unwrap(), b"1");
        assert_eq!(reopened.engine().kind(), EngineKind::Redb);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = StorageConfig {
            engine: EngineKind::Memory,
            path: PathBuf::from("/var/lib/keyfs.redb"),
        };
        let text = toml::to_string(&config).unwrap();
        assert_eq!(StorageConfig::from_toml_str(&text).unwrap(), config);
    }
}
