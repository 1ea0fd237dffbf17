use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Bound, ControlFlow};
use std::sync::RwLock;

use crate::error::{EngineError, EngineResult};
use crate::traits::{KvEngine, ReadTxn, WriteTxn};

type Entries = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory, `BTreeMap`-based engine.
///
/// Intended for tests and embedding. Readers share the `RwLock`; an `update`
/// holds the write lock for its whole duration and stages its writes, so a
/// failed closure leaves the map untouched.
pub struct InMemoryEngine {
    entries: RwLock<Entries>,
}

impl InMemoryEngine {
    /// Create a new empty engine.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored entries.
    ///
    /// # Panics
    ///
    /// If a writer panicked while holding the map.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEngine")
            .field("entries", &self.len())
            .finish()
    }
}

impl KvEngine for InMemoryEngine {
    fn view<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&dyn ReadTxn) -> EngineResult<T>,
    {
        let entries = self.entries.read().map_err(|_| EngineError::Poisoned)?;
        f(&MapView(&*entries))
    }

    fn update<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> EngineResult<T>,
    {
        let mut entries = self.entries.write().map_err(|_| EngineError::Poisoned)?;
        let (out, pending) = {
            let mut txn = StagedWrite {
                base: &*entries,
                pending: BTreeMap::new(),
            };
            let out = f(&mut txn)?;
            (out, txn.pending)
        };
        for (key, value) in pending {
            match value {
                Some(value) => {
                    entries.insert(key, value);
                }
                None => {
                    entries.remove(&key);
                }
            }
        }
        Ok(out)
    }
}

fn prefixed<'m, V>(
    map: &'m BTreeMap<Vec<u8>, V>,
    prefix: &'m [u8],
) -> impl Iterator<Item = (&'m Vec<u8>, &'m V)> + 'm {
    map.range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(k, _)| k.starts_with(prefix))
}

struct MapView<'m>(&'m Entries);

impl ReadTxn for MapView<'_> {
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        Ok(self.0.get(key).cloned())
    }

    fn value_size(&self, key: &[u8]) -> EngineResult<Option<u64>> {
        Ok(self.0.get(key).map(|v| v.len() as u64))
    }

    fn scan_prefix(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8]) -> ControlFlow<()>,
    ) -> EngineResult<()> {
        for (key, _) in prefixed(self.0, prefix) {
            if visit(key).is_break() {
                break;
            }
        }
        Ok(())
    }
}

/// Write view that records changes and applies them only on success.
/// `None` in `pending` marks a removal.
struct StagedWrite<'m> {
    base: &'m Entries,
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl StagedWrite<'_> {
    fn lookup(&self, key: &[u8]) -> Option<&Vec<u8>> {
        match self.pending.get(key) {
            Some(staged) => staged.as_ref(),
            None => self.base.get(key),
        }
    }
}

impl ReadTxn for StagedWrite<'_> {
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        Ok(self.lookup(key).cloned())
    }

    fn value_size(&self, key: &[u8]) -> EngineResult<Option<u64>> {
        Ok(self.lookup(key).map(|v| v.len() as u64))
    }

    fn scan_prefix(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8]) -> ControlFlow<()>,
    ) -> EngineResult<()> {
        let mut keys: BTreeSet<&[u8]> = prefixed(self.base, prefix)
            .map(|(k, _)| k.as_slice())
            .collect();
        for (key, staged) in prefixed(&self.pending, prefix) {
            if staged.is_some() {
                keys.insert(key.as_slice());
            } else {
                keys.remove(key.as_slice());
            }
        }
        for key in keys {
            if visit(key).is_break() {
                break;
            }
        }
        Ok(())
    }
}

impl WriteTxn for StagedWrite<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.pending.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> EngineResult<bool> {
        let existed = self.lookup(key).is_some();
        self.pending.insert(key.to_vec(), None);
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_under(engine: &InMemoryEngine, prefix: &[u8]) -> Vec<Vec<u8>> {
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
    fn put_then_get() {
        let engine = InMemoryEngine::new();
        engine.update(|txn| txn.put(b"a", b"1")).unwrap();

        let value = engine.view(|txn| txn.get(b"a")).unwrap();
        assert_eq!(value.as_deref(), Some(&b"1"[..]));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn get_missing_is_none() {
        let engine = InMemoryEngine::new();
        assert!(engine.view(|txn| txn.get(b"nope")).unwrap().is_none());
        assert!(engine.view(|txn| txn.value_size(b"nope")).unwrap().is_none());
    }

    #[test]
    fn remove_reports_existence() {
        let engine = InMemoryEngine::new();
        engine.update(|txn| txn.put(b"a", b"1")).unwrap();

        assert!(engine.update(|txn| txn.remove(b"a")).unwrap());
        assert!(!engine.update(|txn| txn.remove(b"a")).unwrap());
        assert!(engine.is_empty());
    }

    #[test]
    fn failed_update_discards_writes() {
        let engine = InMemoryEngine::new();
        engine.update(|txn| txn.put(b"keep", b"1")).unwrap();

        let result: EngineResult<()> = engine.update(|txn| {
            txn.put(b"new", b"2")?;
            txn.remove(b"keep")?;
            Err(EngineError::Backend("abort".into()))
        });
        assert!(result.is_err());

        assert_eq!(keys_under(&engine, b""), vec![b"keep".to_vec()]);
    }

    #[test]
    fn len_panics_on_poisoned_map() {
        let engine = std::sync::Arc::new(InMemoryEngine::new());
        let poisoner = std::sync::Arc::clone(&engine);
        let _ = std::thread::spawn(move || {
            let _held = poisoner.entries.write().unwrap();
            panic!("poison the map");
        })
        .join();
        assert!(engine.view(|txn| txn.get(b"a")).is_err());
        let len = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| engine.len()));
        assert!(len.is_err());
    }

    #[test]
    fn scan_is_prefix_bounded_and_ordered() {
        let engine = InMemoryEngine::new();
        engine
            .update(|txn| {
                for key in ["dir/b", "dir/a/1", "dir0", "dia", "dir/c"] {
                    txn.put(key.as_bytes(), b"x")?;
                }
                Ok(())
            })
            .unwrap();

        let keys = keys_under(&engine, b"dir/");
        assert_eq!(
            keys,
            vec![b"dir/a/1".to_vec(), b"dir/b".to_vec(), b"dir/c".to_vec()]
        );
    }

    #[test]
    fn scan_stops_on_break() {
        let engine = InMemoryEngine::new();
        engine
            .update(|txn| {
                txn.put(b"p/1", b"")?;
                txn.put(b"p/2", b"")
            })
            .unwrap();

        let mut seen = 0;
        engine
            .view(|txn| {
                txn.scan_prefix(b"p/", &mut |_| {
                    seen += 1;
                    ControlFlow::Break(())
                })
            })
            .unwrap();
        assert_eq!(seen, 1);
        assert!(engine.view(|txn| txn.has_prefix(b"p/")).unwrap());
        assert!(!engine.view(|txn| txn.has_prefix(b"q/")).unwrap());
    }

    #[test]
    fn write_view_sees_its_own_writes() {
        let engine = InMemoryEngine::new();
        engine.update(|txn| txn.put(b"d/old", b"1")).unwrap();

        let keys = engine
            .update(|txn| {
                txn.put(b"d/new", b"22")?;
                txn.remove(b"d/old")?;
                assert_eq!(txn.value_size(b"d/new")?, Some(2));
                assert!(txn.get(b"d/old")?.is_none());
                let mut keys = Vec::new();
                txn.scan_prefix(b"d/", &mut |k| {
                    keys.push(k.to_vec());
                    ControlFlow::Continue(())
                })?;
                Ok(keys)
            })
            .unwrap();
        assert_eq!(keys, vec![b"d/new".to_vec()]);
    }
}
