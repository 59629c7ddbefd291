//! Reading and writing roster snapshots in remote storage and local files.
//!
//! The shared artifact is overwritten in place with no version check: when
//! two clients save at the same time, the last write wins and the other
//! update is lost. Backup artifacts are never overwritten.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::RemoteSettings;
use crate::constants::{
    BACKUP_PREFIX, BACKUP_TIMESTAMP_FORMAT, CONTAINER_CACHE_TTL, SHARED_ARTIFACT_NAME,
};
use crate::error::{SyncError, SyncResult};
use crate::record::Payload;
use crate::remote::{AccessToken, CredentialSource, RemoteArtifact, RemoteContainer, StorageBackend};
use crate::resolver::{ContainerResolver, ResolvedContainer};
use crate::retention::ExportCounter;
use crate::snapshot::{self, Snapshot};

/// Name of a timestamped backup artifact or export file.
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("{BACKUP_PREFIX}{}.json", at.format(BACKUP_TIMESTAMP_FORMAT))
}

/// Whether an artifact in the container belongs to rota.
pub fn is_sync_artifact(name: &str) -> bool {
    name == SHARED_ARTIFACT_NAME || (name.starts_with(BACKUP_PREFIX) && name.ends_with(".json"))
}

fn newest(artifacts: &[RemoteArtifact]) -> Option<&RemoteArtifact> {
    artifacts.iter().max_by(|a, b| a.last_modified_at.cmp(&b.last_modified_at))
}

/// Decode a snapshot document and convert its dates to native form.
pub fn decode_payload(bytes: &[u8]) -> SyncResult<Payload> {
    let snapshot = snapshot::decode(bytes)?;
    let mut payload = snapshot.payload;
    snapshot::hydrate_dates(&mut payload);
    Ok(payload)
}

struct CachedContainer {
    container: RemoteContainer,
    resolved_at: Instant,
}

pub struct Synchronizer<B, C> {
    backend: B,
    credentials: C,
    settings: RemoteSettings,
    cache: Mutex<Option<CachedContainer>>,
}

impl<B: StorageBackend, C: CredentialSource> Synchronizer<B, C> {
    pub fn new(backend: B, credentials: C, settings: RemoteSettings) -> Self {
        Synchronizer {
            backend,
            credentials,
            settings,
            cache: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn token(&self) -> SyncResult<AccessToken> {
        self.credentials.access_token().await
    }

    fn cached(&self) -> Option<RemoteContainer> {
        let cache = self.cache.lock().ok()?;
        cache
            .as_ref()
            .filter(|c| c.resolved_at.elapsed() < CONTAINER_CACHE_TTL)
            .map(|c| c.container.clone())
    }

    fn remember(&self, container: &RemoteContainer) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(CachedContainer {
                container: container.clone(),
                resolved_at: Instant::now(),
            });
        }
    }

    fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }

    /// A vanished container makes the cached resolution useless.
    fn check<T>(&self, result: SyncResult<T>) -> SyncResult<T> {
        if let Err(SyncError::NotFound(_)) = &result {
            self.invalidate();
        }
        result
    }

    /// Run container resolution now, bypassing the cache.
    pub async fn resolve(&self) -> SyncResult<ResolvedContainer> {
        let token = self.token().await?;
        self.resolve_with(&token).await
    }

    async fn resolve_with(&self, token: &AccessToken) -> SyncResult<ResolvedContainer> {
        let resolved = ContainerResolver::new(&self.backend, &self.settings)
            .resolve_container(token)
            .await?;
        self.remember(&resolved.container);
        Ok(resolved)
    }

    async fn container(&self, token: &AccessToken) -> SyncResult<RemoteContainer> {
        if let Some(container) = self.cached() {
            debug!(container = %container.id, "using cached container");
            return Ok(container);
        }
        Ok(self.resolve_with(token).await?.container)
    }

    async fn shared_artifacts(
        &self,
        token: &AccessToken,
        container: &RemoteContainer,
    ) -> SyncResult<Vec<RemoteArtifact>> {
        let found = self.check(
            self.backend
                .find_artifacts(token, &container.id, SHARED_ARTIFACT_NAME)
                .await,
        )?;

        if found.len() > 1 {
            warn!(
                container = %container.id,
                count = found.len(),
                "multiple '{SHARED_ARTIFACT_NAME}' files found, using the most recently modified"
            );
        }
        Ok(found)
    }

    /// Write `payload` to the shared artifact, creating it if needed.
    pub async fn save_shared(&self, payload: &Payload) -> SyncResult<RemoteArtifact> {
        let token = self.token().await?;
        let body = snapshot::encode(payload.clone()).to_bytes()?;
        let container = self.container(&token).await?;
        let existing = self.shared_artifacts(&token, &container).await?;

        let artifact = match newest(&existing) {
            Some(target) => {
                self.check(self.backend.overwrite_artifact(&token, &target.id, body).await)?
            }
            None => self.check(
                self.backend
                    .create_artifact(&token, &container.id, SHARED_ARTIFACT_NAME, body)
                    .await,
            )?,
        };

        info!(artifact = %artifact.id, records = payload.len(), "saved shared roster");
        Ok(artifact)
    }

    /// Read the shared artifact.
    pub async fn load_shared(&self) -> SyncResult<Payload> {
        let token = self.token().await?;
        let container = self.container(&token).await?;
        let existing = self.shared_artifacts(&token, &container).await?;

        let target = newest(&existing).ok_or_else(|| {
            SyncError::NotFound(format!(
                "no {SHARED_ARTIFACT_NAME} in '{}' yet; save from one client first",
                container.name
            ))
        })?;

        let bytes = self.check(self.backend.fetch_artifact(&token, &target.id).await)?;
        let payload = decode_payload(&bytes)?;
        info!(artifact = %target.id, records = payload.len(), "loaded shared roster");
        Ok(payload)
    }

    /// Read any artifact by id, e.g. one returned by
    /// [`Synchronizer::list_backup_artifacts`].
    pub async fn load_artifact(&self, id: &str) -> SyncResult<Payload> {
        let token = self.token().await?;
        let bytes = self.backend.fetch_artifact(&token, id).await?;
        decode_payload(&bytes)
    }

    /// Upload a new timestamped backup. Never replaces an existing artifact.
    pub async fn create_backup_artifact(&self, payload: &Payload) -> SyncResult<RemoteArtifact> {
        let token = self.token().await?;
        let snapshot = snapshot::encode(payload.clone());
        let name = backup_file_name(snapshot.created_at);
        let body = snapshot.to_bytes()?;
        let container = self.container(&token).await?;

        let artifact = self.check(
            self.backend
                .create_artifact(&token, &container.id, &name, body)
                .await,
        )?;
        info!(artifact = %artifact.id, %name, "created backup");
        Ok(artifact)
    }

    /// The shared artifact and backups this credential can actually open,
    /// newest first.
    pub async fn list_backup_artifacts(&self) -> SyncResult<Vec<RemoteArtifact>> {
        let token = self.token().await?;
        let container = self.container(&token).await?;
        let listed = self.check(self.backend.list_artifacts(&token, &container.id).await)?;

        let mut accessible = Vec::new();
        for artifact in listed.into_iter().filter(|a| is_sync_artifact(&a.name)) {
            match self.backend.artifact_metadata(&token, &artifact.id).await {
                Ok(meta) => accessible.push(meta),
                Err(e) if e.is_inaccessible() => {
                    debug!(artifact = %artifact.id, name = %artifact.name, error = %e, "skipping inaccessible artifact");
                }
                Err(e) => return Err(e),
            }
        }

        accessible.sort_by(|a, b| b.last_modified_at.cmp(&a.last_modified_at));
        Ok(accessible)
    }

    pub async fn delete_artifact(&self, id: &str) -> SyncResult<()> {
        let token = self.token().await?;

        match self.backend.delete_artifact(&token, id).await {
            Ok(()) => {
                info!(artifact = %id, "deleted artifact");
                Ok(())
            }
            Err(SyncError::PermissionDenied(detail)) => Err(SyncError::PermissionDenied(format!(
                "{detail} (it may have been created by another account; only its owner can delete it)"
            ))),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(PathBuf),
    Declined,
}

/// Write `snapshot` to a timestamped file in `dir`.
///
/// Once `max` exports have been recorded, `confirm` is asked with the
/// current count first; declining writes nothing.
pub fn export_local_file(
    snapshot: &Snapshot,
    dir: &Path,
    counter: &mut ExportCounter,
    max: u32,
    confirm: impl FnOnce(u32) -> bool,
) -> SyncResult<ExportOutcome> {
    if counter.needs_confirmation(max) && !confirm(counter.count) {
        return Ok(ExportOutcome::Declined);
    }

    std::fs::create_dir_all(dir)?;
    let (path, mut file) = create_fresh(dir, snapshot.created_at)?;
    file.write_all(&snapshot.to_bytes()?)?;
    counter.record_export();

    info!(path = %path.display(), exports = counter.count, "exported snapshot");
    Ok(ExportOutcome::Written(path))
}

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Open a new export file, never reusing an existing name. Exports within
/// the same second get a numeric suffix.
fn create_fresh(dir: &Path, at: DateTime<Utc>) -> SyncResult<(PathBuf, File)> {
    let base = backup_file_name(at);
    let stem = base.trim_end_matches(".json");

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let name = match attempt {
            1 => base.clone(),
            n => format!("{stem}-{n}.json"),
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(SyncError::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("too many exports named {base} in {}", dir.display()),
    )))
}

pub fn import_local_file(path: &Path) -> SyncResult<Payload> {
    let bytes = std::fs::read(path)?;
    decode_payload(&bytes)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::record::Record;
    use crate::remote::memory::{MemoryBackend, StaticCredentials, container};
    use crate::snapshot::encode_at;
    use chrono::TimeZone;
    use serde_json::json;

    fn settings() -> RemoteSettings {
        RemoteSettings {
            container_name: "Rota Sync".to_string(),
            fixed_container_id: None,
            shared_space_name: None,
            recheck_delay: Duration::ZERO,
        }
    }

    fn with_team_container() -> MemoryBackend {
        MemoryBackend::new().with_container(container("team", "Rota Sync", Some("drive-1"), 0))
    }

    fn synchronizer(backend: MemoryBackend) -> Synchronizer<MemoryBackend, StaticCredentials> {
        Synchronizer::new(backend, StaticCredentials(Some("token")), settings())
    }

    fn roster() -> Payload {
        Payload {
            staff: vec![Record::new("s1").with_field("name", "Ada")],
            one_off_shifts: vec![Record::new("o1").with_field("date", "2025-07-04T08:00:00Z")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_then_load_shared() {
        let sync = synchronizer(with_team_container());

        sync.save_shared(&roster()).await.unwrap();
        let loaded = sync.load_shared().await.unwrap();

        assert_eq!(loaded.staff, roster().staff);
        assert_eq!(
            loaded.one_off_shifts[0].get("date"),
            Some(&json!("2025-07-04T08:00:00.000Z"))
        );
    }

    #[tokio::test]
    async fn test_save_overwrites_existing_shared_artifact() {
        let sync = synchronizer(with_team_container());

        sync.save_shared(&roster()).await.unwrap();
        let mut changed = roster();
        changed.staff.push(Record::new("s2"));
        sync.save_shared(&changed).await.unwrap();

        let stored = sync.backend().artifacts_named(SHARED_ARTIFACT_NAME);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, "team");
        assert_eq!(sync.load_shared().await.unwrap().staff.len(), 2);
    }

    #[tokio::test]
    async fn test_container_resolution_is_cached_between_calls() {
        let sync = synchronizer(with_team_container());

        sync.save_shared(&roster()).await.unwrap();
        sync.load_shared().await.unwrap();

        let searches = sync
            .backend()
            .calls()
            .iter()
            .filter(|c| c.starts_with("find_containers"))
            .count();
        assert_eq!(searches, 1);
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_remote_call() {
        let sync = Synchronizer::new(with_team_container(), StaticCredentials(None), settings());

        let err = sync.save_shared(&roster()).await.unwrap_err();

        assert!(matches!(err, SyncError::AuthenticationRequired));
        assert!(sync.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn test_load_shared_without_artifact_is_not_found() {
        let sync = synchronizer(with_team_container());

        assert!(matches!(
            sync.load_shared().await,
            Err(SyncError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_vanished_shared_content_drops_cached_container() {
        let backend = with_team_container();
        let id = backend.seed_artifact("team", SHARED_ARTIFACT_NAME, b"{}", 1);
        let sync = synchronizer(backend.unreachable(&id));

        for _ in 0..2 {
            assert!(matches!(
                sync.load_shared().await,
                Err(SyncError::NotFound(_))
            ));
        }

        let searches = sync
            .backend()
            .calls()
            .iter()
            .filter(|c| c.starts_with("find_containers"))
            .count();
        assert_eq!(searches, 2);
    }

    #[tokio::test]
    async fn test_load_shared_rejects_unsupported_version() {
        let backend = with_team_container();
        let doc = json!({
            "formatVersion": "3.0",
            "createdAt": "2025-01-01T00:00:00Z",
            "data": {"staff": [], "recurringSchedules": [], "leaveRequests": []}
        });
        backend.seed_artifact("team", SHARED_ARTIFACT_NAME, doc.to_string().as_bytes(), 1);
        let sync = synchronizer(backend);

        assert!(matches!(
            sync.load_shared().await,
            Err(SyncError::VersionUnsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_drops_inaccessible_artifacts() {
        let backend = with_team_container();
        let body = encode_at(roster(), Utc::now()).to_bytes().unwrap();
        let a = backend.seed_artifact("team", SHARED_ARTIFACT_NAME, &body, 5);
        let b = backend.seed_artifact("team", "rota-backup-20250101-000000.json", &body, 9);
        let backend = backend.deny(&b);
        let sync = synchronizer(backend);

        let listed = sync.list_backup_artifacts().await.unwrap();

        let ids: Vec<_> = listed.iter().map(|x| x.id.clone()).collect();
        assert_eq!(ids, vec![a]);
    }

    #[tokio::test]
    async fn test_listing_is_newest_first_and_ignores_other_files() {
        let backend = with_team_container();
        let old = backend.seed_artifact("team", "rota-backup-20240101-000000.json", b"{}", 1);
        let new = backend.seed_artifact("team", "rota-backup-20250101-000000.json", b"{}", 20);
        let shared = backend.seed_artifact("team", SHARED_ARTIFACT_NAME, b"{}", 10);
        backend.seed_artifact("team", "notes.txt", b"hi", 30);
        let sync = synchronizer(backend);

        let ids: Vec<_> = sync
            .list_backup_artifacts()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();

        assert_eq!(ids, vec![new, shared, old]);
    }

    #[tokio::test]
    async fn test_backup_artifacts_are_never_overwritten() {
        let sync = synchronizer(with_team_container());

        sync.create_backup_artifact(&roster()).await.unwrap();
        sync.create_backup_artifact(&roster()).await.unwrap();

        let backups: Vec<_> = sync
            .backend()
            .artifact_names()
            .into_iter()
            .filter(|n| n.starts_with(BACKUP_PREFIX))
            .collect();
        assert_eq!(backups.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_classifies_permission_denied() {
        let backend = with_team_container();
        let id = backend.seed_artifact("team", "rota-backup-20250101-000000.json", b"{}", 1);
        let sync = synchronizer(backend.deny(&id));

        let err = sync.delete_artifact(&id).await.unwrap_err();
        assert!(matches!(err, SyncError::PermissionDenied(msg) if msg.contains("another account")));

        let err = sync.delete_artifact("missing").await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_restore_from_listed_backup() {
        let sync = synchronizer(with_team_container());
        let artifact = sync.create_backup_artifact(&roster()).await.unwrap();

        let payload = sync.load_artifact(&artifact.id).await.unwrap();
        assert_eq!(payload.staff, roster().staff);
    }

    #[test]
    fn test_export_asks_once_past_maximum() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = encode_at(roster(), Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap());
        let mut counter = ExportCounter { count: 1 };

        let outcome =
            export_local_file(&snapshot, dir.path(), &mut counter, 2, |_| panic!("not yet")).unwrap();
        let ExportOutcome::Written(path) = outcome else {
            panic!("expected a written file");
        };
        assert!(path.ends_with("rota-backup-20250203-040506.json"));
        assert_eq!(counter.count, 2);

        let outcome = export_local_file(&snapshot, dir.path(), &mut counter, 2, |count| {
            assert_eq!(count, 2);
            false
        })
        .unwrap();
        assert_eq!(outcome, ExportOutcome::Declined);
        assert_eq!(counter.count, 2);
    }

    #[test]
    fn test_same_second_exports_keep_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap();
        let mut counter = ExportCounter::default();
        let mut second = roster();
        second.staff.push(Record::new("s2"));

        let ExportOutcome::Written(first_path) =
            export_local_file(&encode_at(roster(), at), dir.path(), &mut counter, 5, |_| true)
                .unwrap()
        else {
            panic!("expected a written file");
        };
        let ExportOutcome::Written(second_path) =
            export_local_file(&encode_at(second, at), dir.path(), &mut counter, 5, |_| true)
                .unwrap()
        else {
            panic!("expected a written file");
        };

        assert_ne!(first_path, second_path);
        assert!(second_path.ends_with("rota-backup-20250203-040506-2.json"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
        assert_eq!(counter.count, 2);
        assert_eq!(import_local_file(&first_path).unwrap().staff.len(), 1);
        assert_eq!(import_local_file(&second_path).unwrap().staff.len(), 2);
    }

    #[test]
    fn test_exported_file_imports_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut counter = ExportCounter::default();

        let outcome = export_local_file(
            &snapshot::encode(roster()),
            dir.path(),
            &mut counter,
            5,
            |_| true,
        )
        .unwrap();
        let ExportOutcome::Written(path) = outcome else {
            panic!("expected a written file");
        };

        let payload = import_local_file(&path).unwrap();
        assert_eq!(payload.staff, roster().staff);
    }

    #[test]
    fn test_sync_artifact_names() {
        assert!(is_sync_artifact(SHARED_ARTIFACT_NAME));
        assert!(is_sync_artifact("rota-backup-20250101-000000.json"));
        assert!(!is_sync_artifact("rota-backup-notes.txt"));
        assert!(!is_sync_artifact("schedule.xlsx"));
    }
}
