use anyhow::Result;
use dialoguer::Confirm;
use owo_colors::OwoColorize;
use rota_core::local::LocalStore;
use rota_core::snapshot;
use rota_core::sync::{ExportOutcome, export_local_file};

use super::Context;

pub fn run() -> Result<()> {
    let ctx = Context::load()?;
    let payload = ctx.store.load_payload()?;
    let mut counter = ctx.store.load_export_counter()?;
    let dir = ctx.config.export_path();

    let outcome = export_local_file(
        &snapshot::encode(payload),
        &dir,
        &mut counter,
        ctx.config.retention.max_local_exports,
        |count| confirm_export(count, &dir.display().to_string()),
    )?;

    match outcome {
        ExportOutcome::Written(path) => {
            ctx.store.save_export_counter(&counter)?;
            println!("{} {}", "Exported".green(), path.display());
        }
        ExportOutcome::Declined => println!("{}", "Export cancelled".dimmed()),
    }

    Ok(())
}

/// A failed prompt (e.g. no terminal) counts as declining.
fn confirm_export(count: u32, dir: &str) -> bool {
    println!(
        "{}",
        format!("{count} exports written since the counter was last reset. Older files may be piling up in {dir}.")
            .yellow()
    );
    println!(
        "{}",
        "Run `rota reset-export-counter` after cleaning them up.".dimmed()
    );

    Confirm::new()
        .with_prompt("Export anyway?")
        .default(false)
        .interact()
        .unwrap_or(false)
}

pub fn reset_counter() -> Result<()> {
    let ctx = Context::load()?;
    let mut counter = ctx.store.load_export_counter()?;
    let previous = counter.count;

    counter.reset();
    ctx.store.save_export_counter(&counter)?;

    println!("Export counter reset (was {previous})");
    Ok(())
}
