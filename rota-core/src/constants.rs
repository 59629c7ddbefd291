use std::time::Duration;

/// Name of the container every collaborator looks for.
pub const DEFAULT_CONTAINER_NAME: &str = "Rota Sync";

/// The single shared artifact, overwritten in place.
pub const SHARED_ARTIFACT_NAME: &str = "rota-shared.json";

/// Prefix of timestamped backup artifacts and local export files.
pub const BACKUP_PREFIX: &str = "rota-backup-";

pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

pub const DEFAULT_DATA_DIR: &str = "~/.local/share/rota";

pub const DEFAULT_RECHECK_DELAY: Duration = Duration::from_secs(2);

/// How long a resolved container is reused before resolving again.
pub const CONTAINER_CACHE_TTL: Duration = Duration::from_secs(60);

pub const DEFAULT_MAX_LOCAL_EXPORTS: u32 = 5;

pub const DEFAULT_AUTO_BACKUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub const DEFAULT_AUTO_BACKUP_HISTORY: usize = 7;
