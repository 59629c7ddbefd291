use anyhow::Result;
use owo_colors::OwoColorize;

use super::Context;
use crate::render::Render;
use crate::utils::tui;

pub async fn run() -> Result<()> {
    let ctx = Context::load()?;
    let sync = ctx.synchronizer()?;

    let spinner = tui::create_spinner("Listing backups".to_string());
    let result = sync.list_backup_artifacts().await;
    spinner.finish_and_clear();

    let artifacts = result?;
    if artifacts.is_empty() {
        println!("{}", "No backups found".dimmed());
        return Ok(());
    }

    for artifact in &artifacts {
        println!("{}", artifact.render());
    }
    println!("\nRun `rota restore <id>` to restore one.");

    Ok(())
}
