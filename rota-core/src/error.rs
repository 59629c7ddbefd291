//! Error types for rota.

use std::fmt;

use thiserror::Error;

/// Errors that can occur while synchronizing the roster.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Not signed in. Run `rota auth` to connect your account.")]
    AuthenticationRequired,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported snapshot format version '{0}'")]
    VersionUnsupported(String),

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Remote storage returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for rota operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// The message category a failure is reported under, independent of which
/// step produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Auth,
    Permission,
    NotFound,
    Version,
    Network,
    Local,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCategory::Auth => "auth",
            ErrorCategory::Permission => "permission",
            ErrorCategory::NotFound => "not-found",
            ErrorCategory::Version => "version",
            ErrorCategory::Network => "network",
            ErrorCategory::Local => "local",
        };
        f.write_str(label)
    }
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::AuthenticationRequired => ErrorCategory::Auth,
            SyncError::PermissionDenied(_) => ErrorCategory::Permission,
            SyncError::NotFound(_) => ErrorCategory::NotFound,
            SyncError::VersionUnsupported(_) | SyncError::MalformedSnapshot(_) => {
                ErrorCategory::Version
            }
            SyncError::NetworkFailure(_) | SyncError::Backend { .. } => ErrorCategory::Network,
            SyncError::Config(_) | SyncError::Io(_) | SyncError::Serialization(_) => {
                ErrorCategory::Local
            }
        }
    }

    /// A human-readable message for the failure's category, suitable for
    /// showing regardless of which remote call failed.
    pub fn user_message(&self) -> String {
        match self.category() {
            ErrorCategory::Auth => {
                "You are not signed in to remote storage. Sign in and try again.".to_string()
            }
            ErrorCategory::Permission => {
                "Remote storage refused access. The file or folder may belong to another \
                 account; ask its owner to share it with you."
                    .to_string()
            }
            ErrorCategory::NotFound => {
                "The remote file or folder no longer exists or is not visible to this account."
                    .to_string()
            }
            ErrorCategory::Version => match self {
                SyncError::VersionUnsupported(v) => format!(
                    "This backup was written by an unsupported version ({v}). Nothing was changed."
                ),
                _ => "This backup is damaged or not a rota snapshot. Nothing was changed."
                    .to_string(),
            },
            ErrorCategory::Network => {
                "Could not reach remote storage. Check your connection and try again.".to_string()
            }
            ErrorCategory::Local => self.to_string(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::AuthenticationRequired)
    }

    /// Whether the failure means the object is not usable by this credential.
    pub fn is_inaccessible(&self) -> bool {
        matches!(self, SyncError::PermissionDenied(_) | SyncError::NotFound(_))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}
