//! rota configuration at ~/.config/rota/config.toml
//!
//! Every setting is optional; a missing file means defaults. Values can be
//! overridden from the environment with a `ROTA_` prefix, e.g.
//! `ROTA_REMOTE__FIXED_CONTAINER_ID`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};

use crate::constants::{
    DEFAULT_AUTO_BACKUP_HISTORY, DEFAULT_AUTO_BACKUP_INTERVAL, DEFAULT_CONTAINER_NAME,
    DEFAULT_DATA_DIR, DEFAULT_MAX_LOCAL_EXPORTS, DEFAULT_RECHECK_DELAY,
};
use crate::error::{SyncError, SyncResult};

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_container_name() -> String {
    DEFAULT_CONTAINER_NAME.to_string()
}

fn default_recheck_delay() -> Duration {
    DEFAULT_RECHECK_DELAY
}

fn default_max_local_exports() -> u32 {
    DEFAULT_MAX_LOCAL_EXPORTS
}

fn default_auto_backup_interval() -> Duration {
    DEFAULT_AUTO_BACKUP_INTERVAL
}

fn default_auto_backup_history() -> usize {
    DEFAULT_AUTO_BACKUP_HISTORY
}

/// Durations are written the humantime way: "90s", "24h", "1day 2h".
fn humantime_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize)]
pub struct RotaConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Where local exports are written. Defaults to the current directory.
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub retention: RetentionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSettings {
    /// Name every collaborator's container is searched and created under.
    #[serde(default = "default_container_name")]
    pub container_name: String,

    /// Pin one container and skip discovery while it is reachable.
    #[serde(default)]
    pub fixed_container_id: Option<String>,

    /// Shared space new containers are created in, when one by this name exists.
    #[serde(default)]
    pub shared_space_name: Option<String>,

    /// Wait before re-checking for a concurrent creation.
    #[serde(
        default = "default_recheck_delay",
        deserialize_with = "humantime_duration"
    )]
    pub recheck_delay: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionSettings {
    #[serde(default = "default_max_local_exports")]
    pub max_local_exports: u32,

    #[serde(
        default = "default_auto_backup_interval",
        deserialize_with = "humantime_duration"
    )]
    pub auto_backup_interval: Duration,

    #[serde(default = "default_auto_backup_history")]
    pub auto_backup_history: usize,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            container_name: default_container_name(),
            fixed_container_id: None,
            shared_space_name: None,
            recheck_delay: default_recheck_delay(),
        }
    }
}

impl Default for RetentionSettings {
    fn default() -> Self {
        RetentionSettings {
            max_local_exports: default_max_local_exports(),
            auto_backup_interval: default_auto_backup_interval(),
            auto_backup_history: default_auto_backup_history(),
        }
    }
}

impl Default for RotaConfig {
    fn default() -> Self {
        RotaConfig {
            data_dir: default_data_dir(),
            export_dir: None,
            remote: RemoteSettings::default(),
            retention: RetentionSettings::default(),
        }
    }
}

impl RotaConfig {
    pub fn config_dir() -> SyncResult<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
            .join("rota"))
    }

    pub fn config_path() -> SyncResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load from the default location and validate.
    pub fn load() -> SyncResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> SyncResult<Self> {
        let config: RotaConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("ROTA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.remote.container_name.trim().is_empty() {
            return Err(SyncError::Config("remote.container_name must not be empty".into()));
        }

        if let Some(id) = &self.remote.fixed_container_id {
            if id.trim().is_empty() {
                return Err(SyncError::Config(
                    "remote.fixed_container_id must not be empty when set".into(),
                ));
            }
        }

        if let Some(name) = &self.remote.shared_space_name {
            if name.trim().is_empty() {
                return Err(SyncError::Config(
                    "remote.shared_space_name must not be empty when set".into(),
                ));
            }
        }

        if self.retention.max_local_exports == 0 {
            return Err(SyncError::Config(
                "retention.max_local_exports must be at least 1".into(),
            ));
        }

        if self.retention.auto_backup_history == 0 {
            return Err(SyncError::Config(
                "retention.auto_backup_history must be at least 1".into(),
            ));
        }

        if self.retention.auto_backup_interval.is_zero() {
            return Err(SyncError::Config(
                "retention.auto_backup_interval must be longer than zero".into(),
            ));
        }

        Ok(())
    }

    /// The data directory with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        expand(&self.data_dir)
    }

    pub fn export_path(&self) -> PathBuf {
        self.export_dir
            .as_deref()
            .map(expand)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
