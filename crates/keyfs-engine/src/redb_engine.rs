use std::ops::ControlFlow;
use std::path::Path;

use redb::backends::InMemoryBackend;
use redb::{Database, ReadableTable, Table, TableDefinition};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::traits::{KvEngine, ReadTxn, WriteTxn};

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("keyfs");

/// Engine backed by redb, a pure-Rust embedded transactional database.
///
/// Every `view` is a redb read transaction and every `update` a write
/// transaction, so both inherit redb's atomicity and snapshot reads.
pub struct RedbEngine {
    db: Database,
}

impl RedbEngine {
    /// Open or create a database file at `path`.
    pub fn open(path: &Path) -> EngineResult<Self> {
        let db = Database::create(path).map_err(EngineError::backend)?;
        debug!(path = %path.display(), "opened redb engine");
        Self::init(db)
    }

    /// Create a database that lives only in memory.
    pub fn in_memory() -> EngineResult<Self> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .map_err(EngineError::backend)?;
        Self::init(db)
    }

    fn init(db: Database) -> EngineResult<Self> {
        // Read transactions fail on a missing table, so create it up front.
        let txn = db.begin_write().map_err(EngineError::backend)?;
        {
            let _table = txn.open_table(TABLE).map_err(EngineError::backend)?;
        }
        txn.commit().map_err(EngineError::backend)?;
        Ok(Self { db })
    }
}

impl std::fmt::Debug for RedbEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbEngine").finish_non_exhaustive()
    }
}

impl KvEngine for RedbEngine {
    fn view<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&dyn ReadTxn) -> EngineResult<T>,
    {
        let txn = self.db.begin_read().map_err(EngineError::backend)?;
        let table = txn.open_table(TABLE).map_err(EngineError::backend)?;
        f(&TableView(table))
    }

    fn update<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> EngineResult<T>,
    {
        let txn = self.db.begin_write().map_err(EngineError::backend)?;
        let outcome = {
            let table = txn.open_table(TABLE).map_err(EngineError::backend)?;
            f(&mut TableView(table))
        };
        match outcome {
            Ok(out) => {
                txn.commit().map_err(EngineError::backend)?;
                Ok(out)
            }
            Err(err) => {
                if let Err(abort) = txn.abort() {
                    warn!(error = %abort, "failed to abort redb write transaction");
                }
                Err(err)
            }
        }
    }
}

/// Adapts any readable redb table to the engine's transaction views.
struct TableView<T>(T);

impl<T> ReadTxn for TableView<T>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let guard = self.0.get(key).map_err(EngineError::backend)?;
        Ok(guard.map(|v| v.value().to_vec()))
    }

    fn value_size(&self, key: &[u8]) -> EngineResult<Option<u64>> {
        let guard = self.0.get(key).map_err(EngineError::backend)?;
        Ok(guard.map(|v| v.value().len() as u64))
    }

    fn scan_prefix(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8]) -> ControlFlow<()>,
    ) -> EngineResult<()> {
        let range = self.0.range(prefix..).map_err(EngineError::backend)?;
        for entry in range {
            let (key, _) = entry.map_err(EngineError::backend)?;
            let key = key.value();
            if !key.starts_with(prefix) || visit(key).is_break() {
                break;
            }
        }
        Ok(())
    }
}

impl WriteTxn for TableView<Table<'_, &'static [u8], &'static [u8]>> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.0.insert(key, value).map_err(EngineError::backend)?;
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> EngineResult<bool> {
        let removed = self.0.remove(key).map_err(EngineError::backend)?;
        Ok(removed.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(engine: &RedbEngine, prefix: &[u8]) -> Vec<Vec<u8>> {
        engine
            .view(|txn| {
                let mut keys = Vec::new();
                txn.scan_prefix(prefix, &mut |k| {
                    keys.push(k.to_vec());
                    ControlFlow::Continue(())
                })?;
                Ok(keys)
            })
            .unwrap()
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyfs.redb");

        {
            let engine = RedbEngine::open(&path).unwrap();
            engine.update(|txn| txn.put(b"certs/a.crt", b"pem")).unwrap();
        }

        let engine = RedbEngine::open(&path).unwrap();
        let value = engine.view(|txn| txn.get(b"certs/a.crt")).unwrap();
        assert_eq!(value.as_deref(), Some(&b"pem"[..]));
    }

    #[test]
    fn value_size_matches_stored_length() {
        let engine = RedbEngine::in_memory().unwrap();
        engine.update(|txn| txn.put(b"k", &[7u8; 42])).unwrap();
        assert_eq!(engine.view(|txn| txn.value_size(b"k")).unwrap(), Some(42));
        assert_eq!(engine.view(|txn| txn.value_size(b"x")).unwrap(), None);
    }

    #[test]
    fn remove_reports_existence() {
        let engine = RedbEngine::in_memory().unwrap();
        engine.update(|txn| txn.put(b"k", b"v")).unwrap();
        assert!(engine.update(|txn| txn.remove(b"k")).unwrap());
        assert!(!engine.update(|txn| txn.remove(b"k")).unwrap());
    }

    #[test]
    fn failed_update_is_rolled_back() {
        let engine = RedbEngine::in_memory().unwrap();
        let result: EngineResult<()> = engine.update(|txn| {
            txn.put(b"ghost", b"boo")?;
            Err(EngineError::Backend("abort".into()))
        });
        assert!(result.is_err());
        assert!(engine.view(|txn| txn.get(b"ghost")).unwrap().is_none());
    }

    #[test]
    fn scan_stays_inside_prefix() {
        let engine = RedbEngine::in_memory().unwrap();
        engine
            .update(|txn| {
                for key in ["acme/b", "acme/a/1", "acme0", "acm", "acme/c"] {
                    txn.put(key.as_bytes(), b"")?;
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(
            collect(&engine, b"acme/"),
            vec![b"acme/a/1".to_vec(), b"acme/b".to_vec(), b"acme/c".to_vec()]
        );
        assert!(collect(&engine, b"zzz/").is_empty());
    }

    #[test]
    fn write_view_sees_its_own_writes() {
        let engine = RedbEngine::in_memory().unwrap();
        let seen = engine
            .update(|txn| {
                txn.put(b"d/x", b"1")?;
                txn.has_prefix(b"d/")
            })
            .unwrap();
        assert!(seen);
    }
}
