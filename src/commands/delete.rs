use anyhow::Result;
use dialoguer::Confirm;
use owo_colors::OwoColorize;

use super::Context;
use crate::utils::tui;

pub async fn run(artifact_id: &str, force: bool) -> Result<()> {
    let ctx = Context::load()?;
    let sync = ctx.synchronizer()?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {artifact_id} from the shared folder?"))
            .default(false)
            .interact()?;

        if !confirmed {
            return Ok(());
        }
    }

    let spinner = tui::create_spinner(format!("Deleting {artifact_id}"));
    let result = sync.delete_artifact(artifact_id).await;
    spinner.finish_and_clear();

    result?;
    println!("{} {}", "Deleted".red(), artifact_id);

    Ok(())
}
