use anyhow::Result;

use super::Context;
use crate::render::Render;
use crate::utils::tui;

pub async fn run() -> Result<()> {
    let ctx = Context::load()?;
    let sync = ctx.synchronizer()?;

    let spinner = tui::create_spinner(format!(
        "Looking for '{}'",
        ctx.config.remote.container_name
    ));
    let result = sync.resolve().await;
    spinner.finish_and_clear();

    println!("{}", result?.render());
    Ok(())
}
