//! OAuth client credentials for the Drive provider.
//!
//! User-provided, stored at:
//!   ~/.config/rota/providers/drive/app_config.toml

use std::path::PathBuf;

use rota_core::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};

/// Google OAuth client credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
}

pub fn base_dir() -> SyncResult<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
        .join("rota")
        .join("providers")
        .join("drive"))
}

impl AppConfig {
    pub fn path() -> SyncResult<PathBuf> {
        Ok(base_dir()?.join("app_config.toml"))
    }

    pub fn load() -> SyncResult<Self> {
        let path = Self::path()?;

        if !path.exists() {
            return Err(SyncError::Config(format!(
                "Google credentials not found.\n\n\
                Create {} with:\n\n\
                client_id = \"your-client-id.apps.googleusercontent.com\"\n\
                client_secret = \"your-client-secret\"\n\n\
                See https://console.cloud.google.com/apis/credentials for setup.",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(&path)?;
        Self::parse(&contents)
            .map_err(|e| SyncError::Config(format!("Failed to parse {}: {e}", path.display())))
    }

    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}
