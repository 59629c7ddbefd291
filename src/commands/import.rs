use std::path::Path;

use anyhow::{Context as _, Result};
use rota_core::ReconcileMode;
use rota_core::sync::import_local_file;

use super::Context;

pub fn run(path: &Path, mode: ReconcileMode) -> Result<()> {
    let ctx = Context::load()?;
    let incoming = import_local_file(path)
        .with_context(|| format!("Failed to import {}", path.display()))?;

    ctx.apply(&incoming, mode)?;
    Ok(())
}
