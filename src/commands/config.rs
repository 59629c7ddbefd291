use anyhow::Result;
use owo_colors::OwoColorize;
use rota_core::config::RotaConfig;
use rota_provider_drive::Session;
use rota_provider_drive::app_config::AppConfig;

use super::Context;

pub fn run() -> Result<()> {
    let ctx = Context::load()?;
    let remote = &ctx.config.remote;

    println!("{}", "Paths".bold());
    println!("  Config:       {}", RotaConfig::config_path()?.display());
    println!("  Data:         {}", ctx.store.dir().display());
    println!("  Exports:      {}", ctx.config.export_path().display());
    println!("  Session:      {}", Session::default_path()?.display());
    println!("  Credentials:  {}", AppConfig::path()?.display());

    println!("\n{}", "Remote".bold());
    println!("  Folder name:  {}", remote.container_name);
    if let Some(id) = &remote.fixed_container_id {
        println!("  Pinned to:    {id}");
    }
    if let Some(space) = &remote.shared_space_name {
        println!("  Shared drive: {space}");
    }

    Ok(())
}
