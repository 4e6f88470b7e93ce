use crate::StoreError;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Trait for a key-value storage backend underneath the typed [`Store`](crate::Store).
///
/// Keys are composite strings of the form `"{table}/{id}"`; every
/// logical EMPI table is multiplexed onto this single namespace so one
/// backend implementation serves all of them.
pub trait StoreBackend: Send + Sync {
    /// Insert or overwrite a key-value pair.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    /// Retrieve a value by key.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Delete a key-value pair. A missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
    /// Insert or overwrite multiple key-value pairs as one unit.
    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError>;
    /// Visit every value whose key starts with `prefix`, in ascending
    /// key order.
    fn scan(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;
    /// Flush any buffered writes. A no-op for backends that commit
    /// synchronously.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Configuration for selecting and building a backend.
#[derive(Clone, Debug, Default)]
pub enum BackendConfig {
    /// Use an in-memory `BTreeMap` for storage. The default and sole
    /// shipped backend.
    #[default]
    InMemory,
    /// Use an embedded Redb database at `path`.
    ///
    /// Requires the `backend-redb` feature.
    Redb { path: String },
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    /// Build the backend described by this configuration.
    pub fn build(&self) -> Result<Box<dyn StoreBackend>, StoreError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(MemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(redb::RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(StoreError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

/// An in-memory backend using a `RwLock` around a `BTreeMap`.
///
/// `BTreeMap` rather than `HashMap`: the graph recursor and
/// `query_records` rely on deterministic key ordering to select the
/// minimum `record_id` in a component and to produce reproducible scan
/// results.
pub struct MemoryBackend {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBackend for MemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .remove(key);
        Ok(())
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        for (key, value) in entries {
            guard.insert(key, value);
        }
        Ok(())
    }

    fn scan(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        for (key, value) in guard.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            visitor(key, value)?;
        }
        Ok(())
    }
}

/// Embedded Redb backend, a natural extension point for crash-durable
/// single-process storage. Not required by any tested property of
/// this engine; gated behind the `backend-redb` feature so the default
/// build depends on nothing beyond the in-memory backend.
#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_put_get_delete_roundtrip() {
        let backend = MemoryBackend::new();
        backend.put("demographic/1", b"a").unwrap();
        assert_eq!(backend.get("demographic/1").unwrap(), Some(b"a".to_vec()));
        backend.delete("demographic/1").unwrap();
        assert_eq!(backend.get("demographic/1").unwrap(), None);
    }

    #[test]
    fn memory_backend_scan_respects_prefix_and_order() {
        let backend = MemoryBackend::new();
        backend.put("demographic/2", b"b").unwrap();
        backend.put("demographic/1", b"a").unwrap();
        backend.put("telecom/1", b"c").unwrap();

        let mut seen = Vec::new();
        backend
            .scan("demographic/", &mut |k, v| {
                seen.push((k.to_string(), v.to_vec()));
                Ok(())
            })
            .unwrap();
        assert_eq!(
            seen,
            vec![
                ("demographic/1".to_string(), b"a".to_vec()),
                ("demographic/2".to_string(), b"b".to_vec()),
            ]
        );
    }

    #[test]
    fn memory_backend_batch_put_is_atomic_under_one_lock() {
        let backend = MemoryBackend::new();
        backend
            .batch_put(vec![
                ("a/1".to_string(), b"x".to_vec()),
                ("a/2".to_string(), b"y".to_vec()),
            ])
            .unwrap();
        assert_eq!(backend.get("a/1").unwrap(), Some(b"x".to_vec()));
        assert_eq!(backend.get("a/2").unwrap(), Some(b"y".to_vec()));
    }
}
