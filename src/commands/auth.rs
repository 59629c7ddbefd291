use anyhow::{Context as _, Result};
use owo_colors::OwoColorize;
use rota_provider_drive::Session;
use rota_provider_drive::app_config::AppConfig;

pub async fn run(sign_out: bool) -> Result<()> {
    let session = Session::at_default_path()?;

    if sign_out {
        session.sign_out()?;
        println!("Signed out, removed {}", session.path().display());
        return Ok(());
    }

    // Fail early with setup instructions if client credentials are missing
    AppConfig::load()?;

    println!("Authenticating with Google Drive...");
    let refresh_token = rpassword::prompt_password("Refresh token: ")
        .context("Failed to read refresh token")?;
    let refresh_token = refresh_token.trim();

    if refresh_token.is_empty() {
        anyhow::bail!("No refresh token entered");
    }

    session.sign_in_with_refresh_token(refresh_token).await?;

    println!("{}", "Signed in".green());
    println!("\nRun `rota resolve` to find the shared folder.");

    Ok(())
}
