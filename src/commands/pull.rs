use anyhow::Result;
use rota_core::ReconcileMode;

use super::Context;
use crate::utils::tui;

pub async fn run(mode: ReconcileMode) -> Result<()> {
    let ctx = Context::load()?;
    let sync = ctx.synchronizer()?;

    let spinner = tui::create_spinner("Pulling shared roster".to_string());
    let result = sync.load_shared().await;
    spinner.finish_and_clear();

    let incoming = result?;
    ctx.apply(&incoming, mode)?;

    Ok(())
}
