//! Google Drive storage for rota.
//!
//! Containers map to Drive folders (in My Drive or a shared drive) and
//! artifacts to JSON files inside them.

pub mod app_config;
pub mod drive;
pub mod session;
pub mod types;

pub use drive::DriveBackend;
pub use session::{Session, SessionData};
