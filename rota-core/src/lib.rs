//! Core of rota, the clinic roster synchronizer.
//!
//! This crate provides everything except the concrete remote backend:
//! - `snapshot` for the versioned snapshot document
//! - `reconcile` for combining local and incoming rosters
//! - `resolver` and `sync` for remote container and artifact handling
//! - `retention` and `local` for local exports, auto backups and persistence

pub mod config;
pub mod constants;
pub mod error;
pub mod local;
pub mod reconcile;
pub mod record;
pub mod remote;
pub mod resolver;
pub mod retention;
pub mod snapshot;
pub mod sync;

pub use error::{ErrorCategory, SyncError, SyncResult};
pub use record::{Collection, Payload, Record, TemporalValue};
pub use reconcile::{ReconcileMode, reconcile};
pub use snapshot::Snapshot;
