//! Remote storage types and the seams a storage provider implements.
//!
//! Containers ("folders") and artifacts ("files") are discovered on the
//! remote side; rota never treats its own view of them as authoritative.

#[cfg(test)]
pub(crate) mod memory;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

/// Bearer credential for the remote backend.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        AccessToken(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Supplies the credential used for every remote call.
///
/// Implementations fail with [`crate::SyncError::AuthenticationRequired`]
/// when no valid credential can be produced.
#[allow(async_fn_in_trait)]
pub trait CredentialSource {
    async fn access_token(&self) -> SyncResult<AccessToken>;
}

/// A multi-tenant storage area several principals can write to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSpace {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteContainer {
    pub id: String,
    pub name: String,
    /// Shared space the container lives in, `None` for the private space.
    pub space_id: Option<String>,
    /// Explicit multi-principal permission grant.
    pub is_shared: bool,
    pub owned_by_current_principal: bool,
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl RemoteContainer {
    pub fn is_in_shared_space(&self) -> bool {
        self.space_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArtifact {
    pub id: String,
    pub name: String,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub size_bytes: Option<u64>,
    pub space_id: Option<String>,
    pub is_shared: bool,
    pub owned_by_current_principal: bool,
}

/// Operations rota needs from a remote storage service.
///
/// Every call takes the credential explicitly. Implementations map the
/// service's responses onto the crate error taxonomy: 401 to
/// `AuthenticationRequired`, 403 to `PermissionDenied`, 404 to `NotFound`,
/// transport failures to `NetworkFailure`.
#[allow(async_fn_in_trait)]
pub trait StorageBackend {
    /// All containers called `name`, across the private space and every
    /// shared space the credential can see.
    async fn find_containers(
        &self,
        token: &AccessToken,
        name: &str,
    ) -> SyncResult<Vec<RemoteContainer>>;

    async fn container_metadata(
        &self,
        token: &AccessToken,
        id: &str,
    ) -> SyncResult<RemoteContainer>;

    async fn list_shared_spaces(&self, token: &AccessToken) -> SyncResult<Vec<SharedSpace>>;

    /// Create a container, inside `space_id` when given.
    async fn create_container(
        &self,
        token: &AccessToken,
        name: &str,
        space_id: Option<&str>,
    ) -> SyncResult<RemoteContainer>;

    async fn list_artifacts(
        &self,
        token: &AccessToken,
        container_id: &str,
    ) -> SyncResult<Vec<RemoteArtifact>>;

    async fn find_artifacts(
        &self,
        token: &AccessToken,
        container_id: &str,
        name: &str,
    ) -> SyncResult<Vec<RemoteArtifact>>;

    async fn artifact_metadata(&self, token: &AccessToken, id: &str)
    -> SyncResult<RemoteArtifact>;

    async fn create_artifact(
        &self,
        token: &AccessToken,
        container_id: &str,
        name: &str,
        body: Vec<u8>,
    ) -> SyncResult<RemoteArtifact>;

    /// Replace the whole content of an existing artifact.
    async fn overwrite_artifact(
        &self,
        token: &AccessToken,
        id: &str,
        body: Vec<u8>,
    ) -> SyncResult<RemoteArtifact>;

    async fn fetch_artifact(&self, token: &AccessToken, id: &str) -> SyncResult<Vec<u8>>;

    async fn delete_artifact(&self, token: &AccessToken, id: &str) -> SyncResult<()>;
}
