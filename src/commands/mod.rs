pub mod auth;
pub mod auto_backup;
pub mod backup;
pub mod backups;
pub mod config;
pub mod delete;
pub mod export;
pub mod import;
pub mod pull;
pub mod resolve;
pub mod restore;
pub mod save;

use anyhow::Result;
use rota_core::config::RotaConfig;
use rota_core::local::{Applied, JsonDirStore, apply_incoming};
use rota_core::sync::Synchronizer;
use rota_core::{Payload, ReconcileMode};
use rota_provider_drive::{DriveBackend, Session};

use crate::render::Render;

pub type DriveSync = Synchronizer<DriveBackend, Session>;

/// Loaded config plus the local store it points at.
pub struct Context {
    pub config: RotaConfig,
    pub store: JsonDirStore,
}

impl Context {
    pub fn load() -> Result<Self> {
        let config = RotaConfig::load()?;
        let store = JsonDirStore::new(config.data_path());
        Ok(Context { config, store })
    }

    pub fn synchronizer(&self) -> Result<DriveSync> {
        Ok(Synchronizer::new(
            DriveBackend::new(),
            Session::at_default_path()?,
            self.config.remote.clone(),
        ))
    }

    /// Reconcile `incoming` into the local roster and persist the result.
    pub fn apply(&self, incoming: &Payload, mode: ReconcileMode) -> Result<Applied> {
        let applied = apply_incoming(&self.store, incoming, mode)?;
        println!("{}", applied.render());
        Ok(applied)
    }
}
