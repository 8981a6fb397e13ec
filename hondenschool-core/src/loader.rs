//! Multi-source loading: remote API, then static export, then local bucket.
//!
//! Whatever the remote or static source returns is written to the local
//! bucket before it is handed out, so the bucket always mirrors the last
//! good answer. The bucket itself is the last resort and cannot fail; an
//! empty bucket is a valid result.

use std::fmt;

use futures::future::join_all;
use tracing::{info, warn};

use crate::collection::Collection;
use crate::sheets::{FetchOptions, SheetClient, Transport};
use crate::store::{BucketStore, KeyValueStore, Persistence, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Static,
    Local,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Source::Remote => "remote",
            Source::Static => "static",
            Source::Local => "local",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub collection: Collection,
    pub source: Source,
    pub records: Vec<Record>,
    /// How the mirror write went. `None` when the records came from the
    /// bucket itself.
    pub persistence: Option<Persistence>,
}

pub struct Loader<'a, T: Transport, S: KeyValueStore> {
    client: &'a SheetClient<T>,
    store: &'a BucketStore<S>,
    fetch_options: FetchOptions,
}

impl<'a, T: Transport, S: KeyValueStore> Loader<'a, T, S> {
    pub fn new(client: &'a SheetClient<T>, store: &'a BucketStore<S>) -> Self {
        Loader {
            client,
            store,
            fetch_options: FetchOptions::default(),
        }
    }

    /// Bypass the client's cache for remote reads.
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.fetch_options.force_refresh = force;
        self
    }

    /// Resolve one collection from the most authoritative source available.
    pub async fn load(&self, collection: Collection) -> LoadOutcome {
        match self.client.fetch_collection(collection, self.fetch_options).await {
            Ok(records) => return self.mirror(collection, Source::Remote, records),
            Err(e) => warn!(%collection, error = %e, "Remote unavailable, trying static export"),
        }

        match self.client.fetch_static(collection).await {
            Ok(records) => return self.mirror(collection, Source::Static, records),
            Err(e) => warn!(%collection, error = %e, "Static export unavailable, using local bucket"),
        }

        let records = self.store.read_collection(collection);
        info!(%collection, count = records.len(), source = %Source::Local, "Loaded collection");

        LoadOutcome {
            collection,
            source: Source::Local,
            records,
            persistence: None,
        }
    }

    /// Load several collections concurrently. One outcome per collection,
    /// in the order given.
    pub async fn load_all(&self, collections: &[Collection]) -> Vec<LoadOutcome> {
        join_all(collections.iter().map(|c| self.load(*c))).await
    }

    fn mirror(&self, collection: Collection, source: Source, records: Vec<Record>) -> LoadOutcome {
        let persistence = self.store.write_collection(collection, records);
        // Hand out what the bucket now holds so every source yields
        // normalized records.
        let records = self.store.read_collection(collection);
        info!(%collection, count = records.len(), %source, "Loaded collection");

        LoadOutcome {
            collection,
            source,
            records,
            persistence: Some(persistence),
        }
    }
}
