use anyhow::Result;
use rota_core::ReconcileMode;

use super::Context;
use crate::utils::tui;

pub async fn run(artifact_id: &str, mode: ReconcileMode) -> Result<()> {
    let ctx = Context::load()?;
    let sync = ctx.synchronizer()?;

    let spinner = tui::create_spinner(format!("Downloading {artifact_id}"));
    let result = sync.load_artifact(artifact_id).await;
    spinner.finish_and_clear();

    let incoming = result?;
    ctx.apply(&incoming, mode)?;

    Ok(())
}
