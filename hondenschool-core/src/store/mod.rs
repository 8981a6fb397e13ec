//! Local persistence: named buckets of records over a key-value backend.
//!
//! Each bucket is one JSON array stored under one key and is always replaced
//! as a whole. Reads never fail; writes report whether the data reached the
//! backend or only lives in this process.

mod backend;
mod migrate;
mod normalize;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use migrate::MigrationReport;
pub use normalize::{ACTIEF, INACTIEF, normalize, normalize_record, normalize_status};

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tracing::{debug, warn};

use crate::collection::Collection;

/// A loosely typed entity as stored and fetched.
pub type Record = serde_json::Map<String, Value>;

/// Outcome of a bucket write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    /// Written to the backend.
    Persisted,
    /// The backend refused the write; the records are only held in memory.
    Degraded(String),
}

impl Persistence {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Persistence::Persisted)
    }
}

pub struct BucketStore<S: KeyValueStore> {
    backend: S,
    /// Buckets whose last write did not reach the backend.
    overlay: Mutex<HashMap<String, Vec<Record>>>,
}

impl<S: KeyValueStore> BucketStore<S> {
    pub fn new(backend: S) -> Self {
        BucketStore {
            backend,
            overlay: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Read a bucket. Missing, unreadable or unparsable buckets are empty.
    pub fn read(&self, bucket: &str) -> Vec<Record> {
        if let Some(records) = self.overlay().get(bucket) {
            return records.clone();
        }

        let raw = match self.backend.get(bucket) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(bucket, error = %e, "Bucket read failed, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(values) => normalize(
                values
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::Object(record) => Some(record),
                        _ => None,
                    })
                    .collect(),
            ),
            Err(e) => {
                warn!(bucket, error = %e, "Bucket holds invalid JSON, treating as empty");
                Vec::new()
            }
        }
    }

    /// Replace a bucket's contents.
    pub fn write(&self, bucket: &str, records: Vec<Record>) -> Persistence {
        let records = normalize(records);

        let result = serde_json::to_string(&records)
            .map_err(|e| e.to_string())
            .and_then(|json| self.backend.set(bucket, &json).map_err(|e| e.to_string()));

        match result {
            Ok(()) => {
                self.overlay().remove(bucket);
                debug!(bucket, count = records.len(), "Bucket written");
                Persistence::Persisted
            }
            Err(reason) => {
                warn!(bucket, %reason, "Bucket write failed, keeping records in memory only");
                self.overlay().insert(bucket.to_string(), records);
                Persistence::Degraded(reason)
            }
        }
    }

    pub fn read_collection(&self, collection: Collection) -> Vec<Record> {
        self.read(&collection.bucket_key())
    }

    pub fn write_collection(&self, collection: Collection, records: Vec<Record>) -> Persistence {
        self.write(&collection.bucket_key(), records)
    }

    fn overlay(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Record>>> {
        self.overlay.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A record's id as a string; numeric ids compare equal to their digits.
pub fn id_of(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn find_by_id<'a>(records: &'a [Record], id: &str) -> Option<&'a Record> {
    let id = id.trim();
    records.iter().find(|r| id_of(r).as_deref() == Some(id))
}

/// Drop every record with the given id. Returns how many were removed.
pub fn remove_by_id(records: &mut Vec<Record>, id: &str) -> usize {
    let id = id.trim();
    let before = records.len();
    records.retain(|r| id_of(r).as_deref() != Some(id));
    before - records.len()
}
