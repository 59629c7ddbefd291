use anyhow::Result;
use owo_colors::OwoColorize;
use rota_core::local::LocalStore;

use super::Context;
use crate::utils::tui;

pub async fn run() -> Result<()> {
    let ctx = Context::load()?;
    let sync = ctx.synchronizer()?;
    let payload = ctx.store.load_payload()?;

    if payload.is_empty() {
        println!("{}", "Local roster is empty, saving anyway".yellow());
    }

    let spinner = tui::create_spinner("Saving roster".to_string());
    let result = sync.save_shared(&payload).await;
    spinner.finish_and_clear();

    let artifact = result?;
    println!(
        "{} {} records to {}",
        "Saved".green(),
        payload.len(),
        artifact.name.bold()
    );

    Ok(())
}
