use anyhow::Result;
use hondenschool_core::Collection;
use hondenschool_core::loader::Source;
use owo_colors::OwoColorize;

use super::App;
use crate::render::Render;
use crate::utils::tui::create_spinner;

pub async fn run(collections: Vec<Collection>, refresh: bool) -> Result<()> {
    let app = App::load()?;

    let collections = if collections.is_empty() {
        Collection::ALL.to_vec()
    } else {
        collections
    };

    let spinner = create_spinner(format!("Syncing {} collections", collections.len()));
    let outcomes = app.loader().force_refresh(refresh).load_all(&collections).await;
    spinner.finish_and_clear();

    for outcome in &outcomes {
        println!("{}", outcome.render());
    }

    let fallbacks = outcomes
        .iter()
        .filter(|o| o.source != Source::Remote)
        .count();
    if fallbacks > 0 {
        println!(
            "\n{} of {} collections did not come from the remote sheet",
            fallbacks.yellow(),
            outcomes.len()
        );
    }

    Ok(())
}
