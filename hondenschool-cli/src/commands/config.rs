use anyhow::Result;
use hondenschool_core::Collection;
use hondenschool_core::config::HondenschoolConfig;
use owo_colors::OwoColorize;

use crate::render::MISSING;

pub fn show() -> Result<()> {
    let config_path = HondenschoolConfig::config_path()?;
    let config = HondenschoolConfig::load()?;
    let client = config.sheet_client()?;

    println!("{}", "Paths".bold());
    println!("  Config:     {}", config_path.display());
    println!("  Buckets:    {}", config.data_path().display());

    println!("\n{}", "Remote".bold());
    println!("  Base URL:   {}", config.base_url.as_deref().unwrap_or(MISSING));
    println!("  Origin:     {}", config.origin.as_deref().unwrap_or(MISSING));
    println!(
        "  Timeout:    {}s, {} retries, {}ms backoff",
        config.timeout_secs, config.retries, config.backoff_ms
    );
    println!("  Cache TTL:  {}s", config.cache_ttl_secs);

    // Where a read of the first collection would go, in order.
    if let Ok(urls) = client.candidate_urls(Collection::Lessen) {
        println!("\n{}", "Endpoints tried for lessen".bold());
        for url in urls {
            println!("  {}", url.dimmed());
        }
    }

    Ok(())
}

pub fn set_base_url(url: &str) -> Result<()> {
    let mut config = HondenschoolConfig::load_file()?;
    config.set_base_url(url)?;
    config.save()?;

    println!(
        "{} base URL set to {}",
        "✓".green(),
        config.base_url.as_deref().unwrap_or(MISSING)
    );
    Ok(())
}

pub fn set_origin(url: &str) -> Result<()> {
    let mut config = HondenschoolConfig::load_file()?;
    config.set_origin(url)?;
    config.save()?;

    println!(
        "{} origin set to {}",
        "✓".green(),
        config.origin.as_deref().unwrap_or(MISSING)
    );
    Ok(())
}
