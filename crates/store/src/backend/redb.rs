//! Redb (pure Rust embedded database) backend. Gated behind the
//! `backend-redb` feature; not built by default.

use crate::{StoreBackend, StoreError};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const EMPI_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("empi_data");

/// Every logical EMPI table is multiplexed onto this one Redb table
/// via the `"{table}/{id}"` composite key scheme shared with
/// [`crate::MemoryBackend`].
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(|e| StoreError::backend(e.to_string()))?;

        let write_txn = db
            .begin_write()
            .map_err(|e| StoreError::backend(e.to_string()))?;
        {
            let _table = write_txn
                .open_table(EMPI_TABLE)
                .map_err(|e| StoreError::backend(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::backend(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl StoreBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::backend(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(EMPI_TABLE)
                .map_err(|e| StoreError::backend(e.to_string()))?;
            table
                .insert(key, value)
                .map_err(|e| StoreError::backend(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::backend(e.to_string()))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::backend(e.to_string()))?;
        let table = read_txn
            .open_table(EMPI_TABLE)
            .map_err(|e| StoreError::backend(e.to_string()))?;
        let value = table
            .get(key)
            .map_err(|e| StoreError::backend(e.to_string()))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::backend(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(EMPI_TABLE)
                .map_err(|e| StoreError::backend(e.to_string()))?;
            table
                .remove(key)
                .map_err(|e| StoreError::backend(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::backend(e.to_string()))?;
        Ok(())
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::backend(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(EMPI_TABLE)
                .map_err(|e| StoreError::backend(e.to_string()))?;
            for (key, value) in &entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(|e| StoreError::backend(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::backend(e.to_string()))?;
        Ok(())
    }

    fn scan(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::backend(e.to_string()))?;
        let table = read_txn
            .open_table(EMPI_TABLE)
            .map_err(|e| StoreError::backend(e.to_string()))?;
        for entry in table
            .range(prefix..)
            .map_err(|e| StoreError::backend(e.to_string()))?
        {
            let (key_guard, value_guard) = entry.map_err(|e| StoreError::backend(e.to_string()))?;
            let key = key_guard.value();
            if !key.starts_with(prefix) {
                break;
            }
            visitor(key, value_guard.value())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redb_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RedbBackend::open(dir.path().join("empi.redb")).unwrap();
        backend.put("demographic/1", b"hello").unwrap();
        assert_eq!(
            backend.get("demographic/1").unwrap(),
            Some(b"hello".to_vec())
        );
        backend.delete("demographic/1").unwrap();
        assert_eq!(backend.get("demographic/1").unwrap(), None);
    }

    #[test]
    fn redb_backend_scan_respects_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RedbBackend::open(dir.path().join("empi.redb")).unwrap();
        backend.put("demographic/1", b"a").unwrap();
        backend.put("telecom/1", b"b").unwrap();

        let mut seen = Vec::new();
        backend
            .scan("demographic/", &mut |k, v| {
                seen.push((k.to_string(), v.to_vec()));
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![("demographic/1".to_string(), b"a".to_vec())]);
    }
}
