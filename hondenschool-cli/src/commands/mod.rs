pub mod agenda;
pub mod config;
pub mod lessons;
pub mod migrate;
pub mod notices;
pub mod series;
pub mod sync;

use anyhow::Result;
use hondenschool_core::config::HondenschoolConfig;
use hondenschool_core::loader::{LoadOutcome, Loader};
use hondenschool_core::sheets::{ReqwestTransport, SheetClient};
use hondenschool_core::store::{BucketStore, FileStore, Persistence};
use hondenschool_core::{Collection, Record};
use owo_colors::OwoColorize;
use serde_json::Value;
use tracing::debug;

use crate::render::Render;
use crate::utils::tui::create_spinner;

/// Config, remote client and local buckets, wired up once per command.
pub struct App {
    pub client: SheetClient,
    pub store: BucketStore<FileStore>,
}

impl App {
    pub fn load() -> Result<Self> {
        let config = HondenschoolConfig::load()?;
        let client = config.sheet_client()?;
        let store = config.bucket_store();
        debug!(data_dir = %config.data_path().display(), base_url = ?config.base_url, "Loaded config");

        Ok(App { client, store })
    }

    pub fn loader(&self) -> Loader<'_, ReqwestTransport, FileStore> {
        Loader::new(&self.client, &self.store)
    }

    /// Load collections behind a spinner, reporting anything that fell back.
    pub async fn fetch(&self, collections: &[Collection]) -> Vec<LoadOutcome> {
        let names: Vec<_> = collections.iter().map(|c| c.to_string()).collect();
        let spinner = create_spinner(format!("Loading {}", names.join(", ")));
        let outcomes = self.loader().load_all(collections).await;
        spinner.finish_and_clear();

        for outcome in outcomes.iter().filter(|o| o.persistence.is_none()) {
            eprintln!(
                "{} {} loaded from {} copy",
                "!".yellow(),
                outcome.collection,
                outcome.source.render()
            );
        }

        outcomes
    }

    /// Save a bucket, warning when it only lives in memory.
    pub fn save(&self, collection: Collection, records: Vec<Record>) {
        if let Persistence::Degraded(reason) = self.store.write_collection(collection, records) {
            eprintln!(
                "{} {} not saved to disk: {}",
                "!".yellow(),
                collection,
                reason
            );
        }
    }

    /// Send a write to the remote sheet when requested. Failures are reported
    /// but leave the local change in place.
    pub async fn push(&self, push: bool, collection: Collection, action: &str, payload: Value) {
        if !push {
            return;
        }

        let spinner = create_spinner(format!("Sending {action} to {collection}"));
        let result = self.client.post(collection, action, payload).await;
        spinner.finish_and_clear();

        match result {
            Ok(_) => println!("  {} sent to remote", "✓".green()),
            Err(e) => println!("  {} remote write failed: {}", "✗".red(), e),
        }
    }
}

/// Records of one collection from a set of outcomes.
pub fn records_of(outcomes: &[LoadOutcome], collection: Collection) -> Vec<Record> {
    outcomes
        .iter()
        .find(|o| o.collection == collection)
        .map(|o| o.records.clone())
        .unwrap_or_default()
}
