//! In-memory storage backend used by the resolver and synchronizer tests.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::{SyncError, SyncResult};
use crate::remote::{
    AccessToken, CredentialSource, RemoteArtifact, RemoteContainer, SharedSpace, StorageBackend,
};

struct StoredArtifact {
    meta: RemoteArtifact,
    container_id: String,
    body: Vec<u8>,
}

#[derive(Default)]
struct State {
    containers: Vec<RemoteContainer>,
    spaces: Vec<SharedSpace>,
    artifacts: Vec<StoredArtifact>,
    denied: HashSet<String>,
    unreachable: HashSet<String>,
    fail_search: bool,
    fail_create: bool,
    injected_on_create: Option<RemoteContainer>,
    next_id: u32,
    tick: i64,
    calls: Vec<String>,
}

impl State {
    fn now(&mut self) -> DateTime<Utc> {
        self.tick += 1;
        base_time() + Duration::seconds(self.tick)
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

pub fn container(id: &str, name: &str, space_id: Option<&str>, minutes: i64) -> RemoteContainer {
    RemoteContainer {
        id: id.to_string(),
        name: name.to_string(),
        space_id: space_id.map(str::to_string),
        is_shared: false,
        owned_by_current_principal: true,
        last_modified_at: Some(base_time() + Duration::minutes(minutes)),
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(self, container: RemoteContainer) -> Self {
        self.state.lock().unwrap().containers.push(container);
        self
    }

    pub fn with_space(self, id: &str, name: &str) -> Self {
        self.state.lock().unwrap().spaces.push(SharedSpace {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Metadata and delete calls on `id` answer permission denied.
    pub fn deny(self, id: &str) -> Self {
        self.state.lock().unwrap().denied.insert(id.to_string());
        self
    }

    /// Metadata lookups on container `id` and content fetches of
    /// artifact `id` answer not found.
    pub fn unreachable(self, id: &str) -> Self {
        self.state.lock().unwrap().unreachable.insert(id.to_string());
        self
    }

    pub fn failing_search(self) -> Self {
        self.state.lock().unwrap().fail_search = true;
        self
    }

    pub fn failing_create(self) -> Self {
        self.state.lock().unwrap().fail_create = true;
        self
    }

    /// Simulate another client creating `container` at the same moment as
    /// our next create call.
    pub fn racing_creation(self, container: RemoteContainer) -> Self {
        self.state.lock().unwrap().injected_on_create = Some(container);
        self
    }

    pub fn seed_artifact(&self, container_id: &str, name: &str, body: &[u8], minutes: i64) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id("file");
        state.artifacts.push(StoredArtifact {
            meta: RemoteArtifact {
                id: id.clone(),
                name: name.to_string(),
                last_modified_at: Some(base_time() + Duration::minutes(minutes)),
                size_bytes: Some(body.len() as u64),
                space_id: None,
                is_shared: false,
                owned_by_current_principal: true,
            },
            container_id: container_id.to_string(),
            body: body.to_vec(),
        });
        id
    }

    pub fn container_count(&self) -> usize {
        self.state.lock().unwrap().containers.len()
    }

    pub fn artifacts_named(&self, name: &str) -> Vec<(String, Vec<u8>)> {
        self.state
            .lock()
            .unwrap()
            .artifacts
            .iter()
            .filter(|a| a.meta.name == name)
            .map(|a| (a.container_id.clone(), a.body.clone()))
            .collect()
    }

    pub fn artifact_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .artifacts
            .iter()
            .map(|a| a.meta.name.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl StorageBackend for MemoryBackend {
    async fn find_containers(
        &self,
        _token: &AccessToken,
        name: &str,
    ) -> SyncResult<Vec<RemoteContainer>> {
        self.record(format!("find_containers {name}"));
        let state = self.state.lock().unwrap();
        if state.fail_search {
            return Err(SyncError::NetworkFailure("search unavailable".into()));
        }
        Ok(state
            .containers
            .iter()
            .filter(|c| c.name == name)
            .cloned()
            .collect())
    }

    async fn container_metadata(
        &self,
        _token: &AccessToken,
        id: &str,
    ) -> SyncResult<RemoteContainer> {
        self.record(format!("container_metadata {id}"));
        let state = self.state.lock().unwrap();
        if state.unreachable.contains(id) {
            return Err(SyncError::NotFound(format!("container {id}")));
        }
        state
            .containers
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("container {id}")))
    }

    async fn list_shared_spaces(&self, _token: &AccessToken) -> SyncResult<Vec<SharedSpace>> {
        self.record("list_shared_spaces".to_string());
        Ok(self.state.lock().unwrap().spaces.clone())
    }

    async fn create_container(
        &self,
        _token: &AccessToken,
        name: &str,
        space_id: Option<&str>,
    ) -> SyncResult<RemoteContainer> {
        self.record(format!("create_container {name} {space_id:?}"));
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(SyncError::PermissionDenied("cannot create folders".into()));
        }

        if let Some(other) = state.injected_on_create.take() {
            state.containers.push(other);
        }

        let created = RemoteContainer {
            id: state.fresh_id("folder"),
            name: name.to_string(),
            space_id: space_id.map(str::to_string),
            is_shared: space_id.is_some(),
            owned_by_current_principal: true,
            last_modified_at: Some(state.now()),
        };
        state.containers.push(created.clone());
        Ok(created)
    }

    async fn list_artifacts(
        &self,
        _token: &AccessToken,
        container_id: &str,
    ) -> SyncResult<Vec<RemoteArtifact>> {
        self.record(format!("list_artifacts {container_id}"));
        Ok(self
            .state
            .lock()
            .unwrap()
            .artifacts
            .iter()
            .filter(|a| a.container_id == container_id)
            .map(|a| a.meta.clone())
            .collect())
    }

    async fn find_artifacts(
        &self,
        _token: &AccessToken,
        container_id: &str,
        name: &str,
    ) -> SyncResult<Vec<RemoteArtifact>> {
        self.record(format!("find_artifacts {container_id} {name}"));
        Ok(self
            .state
            .lock()
            .unwrap()
            .artifacts
            .iter()
            .filter(|a| a.container_id == container_id && a.meta.name == name)
            .map(|a| a.meta.clone())
            .collect())
    }

    async fn artifact_metadata(
        &self,
        _token: &AccessToken,
        id: &str,
    ) -> SyncResult<RemoteArtifact> {
        self.record(format!("artifact_metadata {id}"));
        let state = self.state.lock().unwrap();
        if state.denied.contains(id) {
            return Err(SyncError::PermissionDenied(format!("file {id}")));
        }
        state
            .artifacts
            .iter()
            .find(|a| a.meta.id == id)
            .map(|a| a.meta.clone())
            .ok_or_else(|| SyncError::NotFound(format!("file {id}")))
    }

    async fn create_artifact(
        &self,
        _token: &AccessToken,
        container_id: &str,
        name: &str,
        body: Vec<u8>,
    ) -> SyncResult<RemoteArtifact> {
        self.record(format!("create_artifact {container_id} {name}"));
        let mut state = self.state.lock().unwrap();
        let meta = RemoteArtifact {
            id: state.fresh_id("file"),
            name: name.to_string(),
            last_modified_at: Some(state.now()),
            size_bytes: Some(body.len() as u64),
            space_id: None,
            is_shared: false,
            owned_by_current_principal: true,
        };
        state.artifacts.push(StoredArtifact {
            meta: meta.clone(),
            container_id: container_id.to_string(),
            body,
        });
        Ok(meta)
    }

    async fn overwrite_artifact(
        &self,
        _token: &AccessToken,
        id: &str,
        body: Vec<u8>,
    ) -> SyncResult<RemoteArtifact> {
        self.record(format!("overwrite_artifact {id}"));
        let mut state = self.state.lock().unwrap();
        let now = state.now();
        let stored = state
            .artifacts
            .iter_mut()
            .find(|a| a.meta.id == id)
            .ok_or_else(|| SyncError::NotFound(format!("file {id}")))?;
        stored.meta.last_modified_at = Some(now);
        stored.meta.size_bytes = Some(body.len() as u64);
        stored.body = body;
        Ok(stored.meta.clone())
    }

    async fn fetch_artifact(&self, _token: &AccessToken, id: &str) -> SyncResult<Vec<u8>> {
        self.record(format!("fetch_artifact {id}"));
        let state = self.state.lock().unwrap();
        if state.unreachable.contains(id) {
            return Err(SyncError::NotFound(format!("file {id}")));
        }
        state
            .artifacts
            .iter()
            .find(|a| a.meta.id == id)
            .map(|a| a.body.clone())
            .ok_or_else(|| SyncError::NotFound(format!("file {id}")))
    }

    async fn delete_artifact(&self, _token: &AccessToken, id: &str) -> SyncResult<()> {
        self.record(format!("delete_artifact {id}"));
        let mut state = self.state.lock().unwrap();
        if state.denied.contains(id) {
            return Err(SyncError::PermissionDenied(format!("file {id}")));
        }
        let before = state.artifacts.len();
        state.artifacts.retain(|a| a.meta.id != id);
        if state.artifacts.len() == before {
            return Err(SyncError::NotFound(format!("file {id}")));
        }
        Ok(())
    }
}

/// Credential source with a fixed answer.
pub struct StaticCredentials(pub Option<&'static str>);

impl CredentialSource for StaticCredentials {
    async fn access_token(&self) -> SyncResult<AccessToken> {
        self.0
            .map(AccessToken::new)
            .ok_or(SyncError::AuthenticationRequired)
    }
}
