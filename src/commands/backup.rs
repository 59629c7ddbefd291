use anyhow::Result;
use owo_colors::OwoColorize;
use rota_core::local::LocalStore;

use super::Context;
use crate::utils::tui;

pub async fn run() -> Result<()> {
    let ctx = Context::load()?;
    let sync = ctx.synchronizer()?;
    let payload = ctx.store.load_payload()?;

    let spinner = tui::create_spinner("Creating backup".to_string());
    let result = sync.create_backup_artifact(&payload).await;
    spinner.finish_and_clear();

    let artifact = result?;
    println!("{} {}", "Created".green(), artifact.name.bold());
    println!("{}", format!("id: {}", artifact.id).dimmed());

    Ok(())
}
