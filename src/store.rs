//! Remote store contract and the JSON-file-backed implementation.
//!
//! The core consumes the store only through the `RemoteStore` trait:
//! key-value collections with acknowledged writes and an ordered,
//! filtered keyset scan. `FileStore` is the bundled implementation, one
//! JSON file holding every collection, rewritten atomically on each
//! write.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub const TASKS: &str = "tasks";
pub const ASSIGNMENTS: &str = "assignments";
pub const PROGRESS: &str = "progress";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Keyset cursor: the ordered field values of a boundary record plus its
/// key as tiebreaker, so records sharing a sort prefix still paginate
/// without gaps or duplicates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScanCursor {
    pub values: Vec<String>,
    pub key: String,
}

/// Which slice of the ordering a scan returns.
#[derive(Debug, Clone)]
pub enum ScanBound {
    /// Every matching record.
    All,
    /// The first `limit` records.
    First { limit: usize },
    /// The first `limit` records strictly after the cursor.
    After { cursor: ScanCursor, limit: usize },
    /// The last `limit` records strictly before the cursor, still in
    /// ascending order.
    Before { cursor: ScanCursor, limit: usize },
}

/// One scanned window plus the cursors of its boundary records.
#[derive(Debug, Clone)]
pub struct ScanPage {
    pub rows: Vec<(String, Value)>,
    pub first: Option<ScanCursor>,
    pub last: Option<ScanCursor>,
}

/// Contract for the remote persisted store.
///
/// Writes must be acknowledged: an `Ok` means the value is durable, an
/// `Err` means it is not, and the caller decides what to roll back.
pub trait RemoteStore {
    fn get_all(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError>;
    fn get_one(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;
    /// Insert or replace a record. With `merge`, object fields are
    /// merged into any existing record instead of replacing it wholesale.
    fn upsert(
        &mut self,
        collection: &str,
        key: &str,
        value: Value,
        merge: bool,
    ) -> Result<(), StoreError>;
    fn delete(&mut self, collection: &str, key: &str) -> Result<(), StoreError>;
    /// Ordered scan over string-typed fields with equality filters.
    fn scan(
        &self,
        collection: &str,
        filters: &[(&str, &str)],
        order_by: &[&str],
        bound: ScanBound,
    ) -> Result<ScanPage, StoreError>;
}

/// Decode fetched rows into typed records.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<(String, Value)>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|(_, value)| serde_json::from_value(value).map_err(StoreError::from))
        .collect()
}

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// JSON-file-backed store.
///
/// The whole dataset is loaded at open; every write rewrites the file via
/// temp + rename, so a failed write leaves the previous file intact and
/// the in-memory copy is restored to match.
#[derive(Debug, Default)]
pub struct FileStore {
    path: Option<PathBuf>,
    collections: Collections,
}

impl FileStore {
    /// Open the store file at `path`, starting empty if it doesn't exist.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let mut store = FileStore {
            path: Some(path.to_path_buf()),
            collections: BTreeMap::new(),
        };
        if path.exists() {
            let mut buf = String::new();
            File::open(path)?.read_to_string(&mut buf)?;
            store.collections = serde_json::from_str(&buf)?;
        }
        Ok(store)
    }

    /// In-memory store with no backing file (tests, dry runs).
    pub fn memory() -> Self {
        FileStore::default()
    }

    fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(&self.collections)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    fn restore(&mut self, collection: &str, key: &str, prior: Option<Value>) {
        let slot = self.collections.entry(collection.to_string()).or_default();
        match prior {
            Some(value) => {
                slot.insert(key.to_string(), value);
            }
            None => {
                slot.remove(key);
            }
        }
    }
}

/// Scans order and filter on string-typed fields; anything else reads as
/// empty.
fn field_str<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).unwrap_or("")
}

impl RemoteStore for FileStore {
    fn get_all(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_one(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|rows| rows.get(key))
            .cloned())
    }

    fn upsert(
        &mut self,
        collection: &str,
        key: &str,
        value: Value,
        merge: bool,
    ) -> Result<(), StoreError> {
        let slot = self.collections.entry(collection.to_string()).or_default();
        let prior = slot.get(key).cloned();
        let next = match (&prior, merge) {
            (Some(Value::Object(old)), true) => {
                let mut merged = old.clone();
                if let Value::Object(new) = value {
                    for (k, v) in new {
                        merged.insert(k, v);
                    }
                }
                Value::Object(merged)
            }
            _ => value,
        };
        slot.insert(key.to_string(), next);
        if let Err(e) = self.save() {
            self.restore(collection, key, prior);
            return Err(e);
        }
        Ok(())
    }

    fn delete(&mut self, collection: &str, key: &str) -> Result<(), StoreError> {
        let slot = self.collections.entry(collection.to_string()).or_default();
        let Some(prior) = slot.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.save() {
            self.restore(collection, key, Some(prior));
            return Err(e);
        }
        Ok(())
    }

    fn scan(
        &self,
        collection: &str,
        filters: &[(&str, &str)],
        order_by: &[&str],
        bound: ScanBound,
    ) -> Result<ScanPage, StoreError> {
        let empty = BTreeMap::new();
        let rows = self.collections.get(collection).unwrap_or(&empty);
        let mut ordered: Vec<(ScanCursor, String, Value)> = rows
            .iter()
            .filter(|(_, value)| {
                filters
                    .iter()
                    .all(|(field, want)| field_str(value, field) == *want)
            })
            .map(|(key, value)| {
                let cursor = ScanCursor {
                    values: order_by
                        .iter()
                        .map(|f| field_str(value, f).to_string())
                        .collect(),
                    key: key.clone(),
                };
                (cursor, key.clone(), value.clone())
            })
            .collect();
        ordered.sort_by(|a, b| a.0.cmp(&b.0));

        let window: Vec<(ScanCursor, String, Value)> = match bound {
            ScanBound::All => ordered,
            ScanBound::First { limit } => ordered.into_iter().take(limit).collect(),
            ScanBound::After { cursor, limit } => ordered
                .into_iter()
                .filter(|(c, _, _)| *c > cursor)
                .take(limit)
                .collect(),
            ScanBound::Before { cursor, limit } => {
                let before: Vec<(ScanCursor, String, Value)> = ordered
                    .into_iter()
                    .filter(|(c, _, _)| *c < cursor)
                    .collect();
                let skip = before.len().saturating_sub(limit);
                before.into_iter().skip(skip).collect()
            }
        };

        let first = window.first().map(|(c, _, _)| c.clone());
        let last = window.last().map(|(c, _, _)| c.clone());
        Ok(ScanPage {
            rows: window.into_iter().map(|(_, k, v)| (k, v)).collect(),
            first,
            last,
        })
    }
}
