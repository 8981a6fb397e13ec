//! One-time split of the legacy single-blob storage into buckets.

use std::collections::HashSet;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::collection::{Collection, LEGACY_KEY, MIGRATION_FLAG_KEY};
use crate::error::StorageError;
use crate::store::{BucketStore, KeyValueStore, Persistence, Record, id_of, normalize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationReport {
    /// The flag was already set; nothing was read.
    AlreadyMigrated,
    /// No legacy blob exists.
    NoLegacyData,
    Migrated { buckets: usize, records: usize },
    /// Migration could not complete and will be retried on the next call.
    Failed(String),
}

/// Field names the legacy blob used for each collection.
fn legacy_fields(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Lessen => &["lessen", "lessons"],
        Collection::Reeksen => &["reeksen", "series"],
        Collection::Locaties => &["locaties", "locations"],
        Collection::Trainers => &["trainers"],
        Collection::Pakketten => &["pakketten", "packages"],
        Collection::Klassen => &["klassen", "classes"],
        Collection::Mededelingen => &["mededelingen", "notices"],
    }
}

impl<S: KeyValueStore> BucketStore<S> {
    /// Copy records from the legacy blob into empty buckets.
    ///
    /// Guarded by a persisted flag so it only runs once. Buckets that already
    /// hold data are left alone. Errors are reported, never raised.
    pub fn migrate_legacy(&self) -> MigrationReport {
        match self.try_migrate_legacy() {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Legacy migration failed");
                MigrationReport::Failed(e.to_string())
            }
        }
    }

    fn try_migrate_legacy(&self) -> Result<MigrationReport, StorageError> {
        if self.backend().get(MIGRATION_FLAG_KEY)?.is_some() {
            return Ok(MigrationReport::AlreadyMigrated);
        }

        let Some(raw) = self.backend().get(LEGACY_KEY)? else {
            self.backend().set(MIGRATION_FLAG_KEY, "1")?;
            return Ok(MigrationReport::NoLegacyData);
        };

        let legacy: Value = serde_json::from_str(&raw)
            .map_err(|e| StorageError::Unavailable(format!("legacy blob is not JSON: {e}")))?;
        let Value::Object(legacy) = legacy else {
            return Err(StorageError::Unavailable(
                "legacy blob is not a JSON object".into(),
            ));
        };

        let mut buckets = 0;
        let mut records = 0;

        for collection in Collection::ALL {
            let found: Vec<Record> = legacy_fields(collection)
                .iter()
                .filter_map(|field| legacy.get(*field))
                .filter_map(Value::as_array)
                .flatten()
                .filter_map(|v| v.as_object().cloned())
                .collect();

            if found.is_empty() {
                continue;
            }
            if !self.read_collection(collection).is_empty() {
                info!(%collection, "Bucket already populated, skipping legacy records");
                continue;
            }

            let deduped = dedupe(normalize(found));
            let count = deduped.len();

            if let Persistence::Degraded(reason) = self.write_collection(collection, deduped) {
                return Err(StorageError::Unavailable(reason));
            }

            buckets += 1;
            records += count;
        }

        self.backend().set(MIGRATION_FLAG_KEY, "1")?;
        info!(buckets, records, "Legacy data migrated");

        Ok(MigrationReport::Migrated { buckets, records })
    }
}

/// Keep the first record per identity: id, else name, else content hash.
fn dedupe(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(identity(record)))
        .collect()
}

fn identity(record: &Record) -> String {
    if let Some(id) = id_of(record) {
        return format!("id:{id}");
    }

    let name = ["name", "naam"]
        .iter()
        .filter_map(|k| record.get(*k))
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .find(|s| !s.is_empty());
    if let Some(name) = name {
        return format!("name:{name}");
    }

    // serde_json maps are ordered by key, so this is stable.
    let canonical = serde_json::to_string(record).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("hash:{hex}")
}
