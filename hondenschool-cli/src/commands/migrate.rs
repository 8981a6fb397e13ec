use std::path::Path;

use anyhow::{Context, Result};
use hondenschool_core::collection::LEGACY_KEY;
use hondenschool_core::config::HondenschoolConfig;
use hondenschool_core::store::{KeyValueStore, MigrationReport};

use crate::render::Render;

pub fn run(from: Option<&Path>) -> Result<()> {
    let config = HondenschoolConfig::load()?;
    let store = config.bucket_store();

    if let Some(path) = from {
        let blob = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        serde_json::from_str::<serde_json::Value>(&blob)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        store.backend().set(LEGACY_KEY, &blob)?;
    }

    let report = store.migrate_legacy();
    println!("{}", report.render());

    if let MigrationReport::Failed(reason) = report {
        anyhow::bail!("Legacy migration failed: {}", reason);
    }

    Ok(())
}
