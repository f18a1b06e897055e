//! Persistent store over RocksDB.
//!
//! Records are serde_json-encoded under string key prefixes; history indexes
//! use big-endian binary keys so a forward iteration yields newest-first
//! order. The store itself is schema-agnostic: domain modules own their key
//! layouts and record types.

use crate::errors::{CasinoError, CasinoResult};
use rocksdb::{Direction, IteratorMode, Options, DB};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct Storage {
    db: Arc<DB>,
    /// Serializes unique-key inserts so "exists?" and "put" are one step.
    unique_insert_guard: Arc<Mutex<()>>,
}

impl Storage {
    pub fn open<P: AsRef<Path>>(path: P, config: &crate::config::StorageConfig) -> CasinoResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        Ok(Self {
            db: Arc::new(db),
            unique_insert_guard: Arc::new(Mutex::new(())),
        })
    }

    /// Open with default tuning in a temporary location. Test helper.
    pub fn open_default<P: AsRef<Path>>(path: P) -> CasinoResult<Self> {
        Self::open(path, &crate::config::StorageConfig::default())
    }

    pub fn get_raw(&self, key: &[u8]) -> CasinoResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    pub fn put_raw(&self, key: &[u8], value: &[u8]) -> CasinoResult<()> {
        Ok(self.db.put(key, value)?)
    }

    pub fn delete(&self, key: &[u8]) -> CasinoResult<()> {
        Ok(self.db.delete(key)?)
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &[u8]) -> CasinoResult<Option<T>> {
        let Some(bytes) = self.db.get(key)? else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&bytes).map_err(|e| {
            CasinoError::Corrupt(format!(
                "failed to decode record at {}: {}",
                String::from_utf8_lossy(key),
                e
            ))
        })?;
        Ok(Some(record))
    }

    pub fn put_json<T: Serialize>(&self, key: &[u8], value: &T) -> CasinoResult<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| CasinoError::Storage(format!("failed to encode record: {}", e)))?;
        Ok(self.db.put(key, bytes)?)
    }

    /// Insert a record only if the key does not exist yet.
    ///
    /// The check and the write happen under one guard, so two concurrent
    /// inserts of the same chain signature cannot both succeed. Returns
    /// `DuplicateTransaction` carrying the key when the record already exists.
    pub fn insert_unique<T: Serialize>(&self, key: &[u8], value: &T) -> CasinoResult<()> {
        let _guard = self
            .unique_insert_guard
            .lock()
            .map_err(|_| CasinoError::ConcurrencyConflict)?;
        if self.db.get(key)?.is_some() {
            return Err(CasinoError::DuplicateTransaction(
                String::from_utf8_lossy(key).into_owned(),
            ));
        }
        let bytes = serde_json::to_vec(value)
            .map_err(|e| CasinoError::Storage(format!("failed to encode record: {}", e)))?;
        Ok(self.db.put(key, bytes)?)
    }

    /// Forward scan of all `(key, value)` pairs under a prefix, up to `limit`.
    pub fn scan_prefix(&self, prefix: &[u8], limit: usize) -> CasinoResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));

        let mut rows = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
            if rows.len() >= limit {
                break;
            }
        }
        Ok(rows)
    }
}

/// Big-endian inverted timestamp, so lexicographic forward order is
/// newest-first.
pub fn inverted_millis(timestamp_millis: i64) -> [u8; 8] {
    (u64::MAX - timestamp_millis.max(0) as u64).to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        value: u64,
    }

    fn open_temp() -> (Storage, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let storage = Storage::open_default(dir.path()).expect("open");
        (storage, dir)
    }

    #[test]
    fn test_json_round_trip() {
        let (storage, _dir) = open_temp();
        let record = Sample {
            name: "alpha".into(),
            value: 7,
        };
        storage.put_json(b"sample:alpha", &record).unwrap();
        let loaded: Option<Sample> = storage.get_json(b"sample:alpha").unwrap();
        assert_eq!(loaded, Some(record));
    }

    #[test]
    fn test_insert_unique_rejects_replay() {
        let (storage, _dir) = open_temp();
        let record = Sample {
            name: "sig".into(),
            value: 1,
        };
        storage.insert_unique(b"chain:tx:abc", &record).unwrap();
        let err = storage.insert_unique(b"chain:tx:abc", &record).unwrap_err();
        assert!(matches!(err, CasinoError::DuplicateTransaction(_)));
    }

    #[test]
    fn test_scan_prefix_stays_inside_prefix() {
        let (storage, _dir) = open_temp();
        storage.put_raw(b"a:1", b"x").unwrap();
        storage.put_raw(b"a:2", b"y").unwrap();
        storage.put_raw(b"b:1", b"z").unwrap();
        let rows = storage.scan_prefix(b"a:", 10).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_inverted_millis_orders_newest_first() {
        let newer = inverted_millis(2_000);
        let older = inverted_millis(1_000);
        assert!(newer < older);
    }
}
