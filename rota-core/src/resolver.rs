//! Finding the one remote container every collaborator should use.
//!
//! Several clients may run first-time setup at the same moment and there is
//! no lock to stop them from each creating a container. Resolution therefore
//! converges on a single container by always preferring the same kinds of
//! results, and reports duplicates so an operator can pin a fixed id.
//!
//! Order of resolution:
//! 1. a configured fixed container id, if its metadata can still be fetched
//! 2. a search by name across the private space and all shared spaces
//! 3. creation, in the configured shared space when it can be found
//! 4. a delayed re-search after creation to detect a concurrent creation

use std::cmp::Ordering;

use tracing::{debug, info, warn};

use crate::config::RemoteSettings;
use crate::error::SyncResult;
use crate::remote::{AccessToken, RemoteContainer, SharedSpace, StorageBackend};

/// How a container was settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The configured fixed container id.
    Pinned,
    /// An existing container found by name.
    Found,
    /// Created by this client with no competing container.
    Created,
    /// Created by this client, but another client created one in the same
    /// space at the same time and that one was chosen instead.
    CreatedRaceLost,
}

#[derive(Debug, Clone)]
pub struct ResolvedContainer {
    pub container: RemoteContainer,
    pub source: ResolutionSource,
    /// Other containers with the same name that were passed over.
    pub duplicates: Vec<RemoteContainer>,
}

impl ResolvedContainer {
    fn single(container: RemoteContainer, source: ResolutionSource) -> Self {
        ResolvedContainer {
            container,
            source,
            duplicates: Vec::new(),
        }
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }
}

/// Most recently modified first; equal times fall back to the smaller id so
/// every client picks the same container from the same listing.
fn recency(a: &RemoteContainer, b: &RemoteContainer) -> Ordering {
    a.last_modified_at
        .cmp(&b.last_modified_at)
        .then_with(|| b.id.cmp(&a.id))
}

fn most_recent<'c>(
    candidates: impl Iterator<Item = &'c RemoteContainer>,
) -> Option<&'c RemoteContainer> {
    candidates.max_by(|a, b| recency(a, b))
}

/// Pick the container collaborators should converge on: one in a shared
/// space, else one with explicit sharing, else the most recently modified.
pub fn pick_preferred(candidates: &[RemoteContainer]) -> Option<&RemoteContainer> {
    most_recent(candidates.iter().filter(|c| c.is_in_shared_space()))
        .or_else(|| most_recent(candidates.iter().filter(|c| c.is_shared)))
        .or_else(|| most_recent(candidates.iter()))
}

pub struct ContainerResolver<'a, B> {
    backend: &'a B,
    settings: &'a RemoteSettings,
}

impl<'a, B: StorageBackend> ContainerResolver<'a, B> {
    pub fn new(backend: &'a B, settings: &'a RemoteSettings) -> Self {
        ContainerResolver { backend, settings }
    }

    pub async fn resolve_container(&self, token: &AccessToken) -> SyncResult<ResolvedContainer> {
        if let Some(pinned) = self.check_fixed(token).await? {
            return Ok(ResolvedContainer::single(pinned, ResolutionSource::Pinned));
        }

        let found = self.search(token).await?;
        if let Some(chosen) = pick_preferred(&found).cloned() {
            let duplicates: Vec<_> = found.into_iter().filter(|c| c.id != chosen.id).collect();

            if !duplicates.is_empty() {
                let others: Vec<&str> = duplicates.iter().map(|c| c.id.as_str()).collect();
                warn!(
                    chosen = %chosen.id,
                    ?others,
                    "{} containers named '{}' exist; collaborators may be split across them. \
                     Set remote.fixed_container_id = \"{}\" to pin one.",
                    duplicates.len() + 1,
                    self.settings.container_name,
                    chosen.id
                );
            } else {
                debug!(container = %chosen.id, "using existing container");
            }

            return Ok(ResolvedContainer {
                container: chosen,
                source: ResolutionSource::Found,
                duplicates,
            });
        }

        let created = self.create(token).await?;
        self.settle_after_creation(token, created).await
    }

    async fn check_fixed(&self, token: &AccessToken) -> SyncResult<Option<RemoteContainer>> {
        let Some(id) = self.settings.fixed_container_id.as_deref() else {
            return Ok(None);
        };

        match self.backend.container_metadata(token, id).await {
            Ok(container) => {
                debug!(container = %id, "fixed container is reachable");
                Ok(Some(container))
            }
            Err(e) if e.is_auth() => Err(e),
            Err(e) => {
                warn!(container = %id, error = %e, "fixed container is not reachable, searching instead");
                Ok(None)
            }
        }
    }

    async fn search(&self, token: &AccessToken) -> SyncResult<Vec<RemoteContainer>> {
        match self
            .backend
            .find_containers(token, &self.settings.container_name)
            .await
        {
            Ok(found) => Ok(found),
            Err(e) if e.is_auth() => Err(e),
            Err(e) => {
                warn!(error = %e, "container search failed, falling back to creation");
                Ok(Vec::new())
            }
        }
    }

    async fn target_space(&self, token: &AccessToken) -> SyncResult<Option<SharedSpace>> {
        let Some(wanted) = self.settings.shared_space_name.as_deref() else {
            return Ok(None);
        };

        match self.backend.list_shared_spaces(token).await {
            Ok(spaces) => {
                let space = spaces.into_iter().find(|s| s.name == wanted);
                if space.is_none() {
                    warn!(space = %wanted, "configured shared space not found, using private space");
                }
                Ok(space)
            }
            Err(e) if e.is_auth() => Err(e),
            Err(e) => {
                warn!(space = %wanted, error = %e, "could not list shared spaces, using private space");
                Ok(None)
            }
        }
    }

    async fn create(&self, token: &AccessToken) -> SyncResult<RemoteContainer> {
        let name = &self.settings.container_name;

        if let Some(space) = self.target_space(token).await? {
            match self
                .backend
                .create_container(token, name, Some(&space.id))
                .await
            {
                Ok(created) => {
                    info!(container = %created.id, space = %space.name, "created container in shared space");
                    return Ok(created);
                }
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    warn!(space = %space.name, error = %e, "could not create container in shared space, trying private space");
                }
            }
        }

        let created = self.backend.create_container(token, name, None).await?;
        info!(container = %created.id, "created container in private space");
        Ok(created)
    }

    /// Look again after creating: if another client created a container in
    /// the same space meanwhile, theirs wins.
    async fn settle_after_creation(
        &self,
        token: &AccessToken,
        created: RemoteContainer,
    ) -> SyncResult<ResolvedContainer> {
        if !self.settings.recheck_delay.is_zero() {
            tokio::time::sleep(self.settings.recheck_delay).await;
        }

        let found = match self
            .backend
            .find_containers(token, &self.settings.container_name)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "could not re-check for a concurrent container creation");
                return Ok(ResolvedContainer::single(created, ResolutionSource::Created));
            }
        };

        let rivals: Vec<RemoteContainer> = found
            .into_iter()
            .filter(|c| c.id != created.id && c.space_id == created.space_id)
            .collect();

        let Some(winner) = pick_preferred(&rivals).cloned() else {
            return Ok(ResolvedContainer::single(created, ResolutionSource::Created));
        };

        warn!(
            created = %created.id,
            chosen = %winner.id,
            "another client created a '{}' container at the same time; using theirs. \
             Set remote.fixed_container_id = \"{}\" on every client to avoid this.",
            self.settings.container_name,
            winner.id
        );

        let mut duplicates: Vec<_> = rivals.into_iter().filter(|c| c.id != winner.id).collect();
        duplicates.push(created);

        Ok(ResolvedContainer {
            container: winner,
            source: ResolutionSource::CreatedRaceLost,
            duplicates,
        })
    }
}
