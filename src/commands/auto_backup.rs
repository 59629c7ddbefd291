use anyhow::Result;
use chrono::{TimeDelta, Utc};
use owo_colors::OwoColorize;
use rota_core::local::LocalStore;
use rota_core::retention::AutoBackupPolicy;
use rota_core::snapshot;

use super::Context;

pub fn run() -> Result<()> {
    let ctx = Context::load()?;
    let policy = AutoBackupPolicy::from(&ctx.config.retention);
    let mut ledger = ctx.store.load_ledger()?;
    let now = Utc::now();

    if !ledger.should_run_auto_backup(&policy, now) {
        let next = ledger
            .last_run_at
            .zip(TimeDelta::from_std(policy.interval).ok())
            .map(|(last, interval)| (last + interval).format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_default();
        println!("{}", format!("Auto backup not due until {next}").dimmed());
        return Ok(());
    }

    let payload = ctx.store.load_payload()?;
    let records = payload.len();
    ledger.record_auto_backup(snapshot::encode_at(payload, now), &policy, now);
    ctx.store.save_ledger(&ledger)?;

    println!(
        "{} auto backup of {} records ({} of {} kept)",
        "Recorded".green(),
        records,
        ledger.history.len(),
        policy.history_cap
    );
    Ok(())
}
