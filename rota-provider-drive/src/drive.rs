//! Google Drive v3 storage backend.
//!
//! Containers are Drive folders and artifacts are JSON files inside them.
//! Every request sets `supportsAllDrives` so folders in shared drives behave
//! the same as those in My Drive.

use reqwest::{Client, Method, RequestBuilder, Response};
use rota_core::remote::{
    AccessToken, RemoteArtifact, RemoteContainer, SharedSpace, StorageBackend,
};
use rota_core::{SyncError, SyncResult};
use tracing::debug;

use crate::types::{
    ApiErrorBody, DriveFile, DriveList, FILE_FIELDS, FOLDER_MIME_TYPE, FileList, NewFile,
};

const API_BASE: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const PAGE_SIZE: &str = "100";
const MULTIPART_BOUNDARY: &str = "rota-multipart-boundary";

/// Quote a value for a Drive search query.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

pub fn folder_query(name: &str) -> String {
    format!(
        "name = {} and mimeType = '{FOLDER_MIME_TYPE}' and trashed = false",
        quote(name)
    )
}

pub fn children_query(folder_id: &str, name: Option<&str>) -> String {
    let mut q = format!(
        "{} in parents and mimeType != '{FOLDER_MIME_TYPE}' and trashed = false",
        quote(folder_id)
    );
    if let Some(name) = name {
        q.push_str(&format!(" and name = {}", quote(name)));
    }
    q
}

/// Map a non-success Drive response onto the error taxonomy.
pub fn status_error(status: u16, what: &str, body: &str) -> SyncError {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .map(|b| b.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    let rate_limited = parsed.as_ref().is_some_and(|b| {
        b.error
            .errors
            .iter()
            .any(|e| e.reason.ends_with("RateLimitExceeded") || e.reason == "rateLimitExceeded")
    });

    match status {
        401 => SyncError::AuthenticationRequired,
        403 if rate_limited => SyncError::Backend { status, message },
        403 => SyncError::PermissionDenied(format!("{what}: {message}")),
        404 => SyncError::NotFound(what.to_string()),
        _ => SyncError::Backend { status, message },
    }
}

/// Body for a multipart/related upload: JSON metadata followed by content.
pub fn multipart_body(metadata: &[u8], content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + content.len() + 256);
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--").as_bytes());
    body
}

#[derive(Clone)]
pub struct DriveBackend {
    http: Client,
    api_base: String,
    upload_base: String,
}

impl Default for DriveBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveBackend {
    pub fn new() -> Self {
        DriveBackend {
            http: Client::new(),
            api_base: API_BASE.to_string(),
            upload_base: UPLOAD_BASE.to_string(),
        }
    }

    fn request(&self, method: Method, url: String, token: &AccessToken) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(token.secret())
            .query(&[("supportsAllDrives", "true")])
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> SyncResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| SyncError::NetworkFailure(format!("{what}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), %what, %body, "drive request failed");
        Err(status_error(status.as_u16(), what, &body))
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response, what: &str) -> SyncResult<T> {
        response
            .json()
            .await
            .map_err(|e| SyncError::Serialization(format!("{what}: {e}")))
    }

    async fn list_files(&self, token: &AccessToken, q: &str, what: &str) -> SyncResult<Vec<DriveFile>> {
        let fields = format!("nextPageToken,files({FILE_FIELDS})");
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .request(Method::GET, format!("{}/files", self.api_base), token)
                .query(&[
                    ("q", q),
                    ("corpora", "allDrives"),
                    ("includeItemsFromAllDrives", "true"),
                    ("pageSize", PAGE_SIZE),
                    ("fields", fields.as_str()),
                ]);
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let page: FileList = Self::json(self.send(request, what).await?, what).await?;
            files.extend(page.files);

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(files)
    }

    async fn file_metadata(&self, token: &AccessToken, id: &str, what: &str) -> SyncResult<DriveFile> {
        let request = self
            .request(Method::GET, format!("{}/files/{id}", self.api_base), token)
            .query(&[("fields", FILE_FIELDS)]);
        let file: DriveFile = Self::json(self.send(request, what).await?, what).await?;

        if file.trashed {
            return Err(SyncError::NotFound(format!("{what} (in trash)")));
        }
        Ok(file)
    }
}

impl StorageBackend for DriveBackend {
    async fn find_containers(
        &self,
        token: &AccessToken,
        name: &str,
    ) -> SyncResult<Vec<RemoteContainer>> {
        let files = self
            .list_files(token, &folder_query(name), "folder search")
            .await?;
        debug!(%name, count = files.len(), "folder search");
        Ok(files.into_iter().map(RemoteContainer::from).collect())
    }

    async fn container_metadata(
        &self,
        token: &AccessToken,
        id: &str,
    ) -> SyncResult<RemoteContainer> {
        let what = format!("folder {id}");
        let file = self.file_metadata(token, id, &what).await?;
        if !file.is_folder() {
            return Err(SyncError::NotFound(format!("{what} is not a folder")));
        }
        Ok(file.into())
    }

    async fn list_shared_spaces(&self, token: &AccessToken) -> SyncResult<Vec<SharedSpace>> {
        let mut spaces = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/drives", self.api_base))
                .bearer_auth(token.secret())
                .query(&[
                    ("pageSize", PAGE_SIZE),
                    ("fields", "nextPageToken,drives(id,name)"),
                ]);
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let page: DriveList =
                Self::json(self.send(request, "shared drive list").await?, "shared drive list").await?;
            spaces.extend(page.drives.into_iter().map(SharedSpace::from));

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(spaces)
    }

    async fn create_container(
        &self,
        token: &AccessToken,
        name: &str,
        space_id: Option<&str>,
    ) -> SyncResult<RemoteContainer> {
        let metadata = NewFile {
            name,
            mime_type: Some(FOLDER_MIME_TYPE),
            parents: space_id.into_iter().collect(),
        };
        let request = self
            .request(Method::POST, format!("{}/files", self.api_base), token)
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata);

        let file: DriveFile =
            Self::json(self.send(request, "folder creation").await?, "folder creation").await?;
        Ok(file.into())
    }

    async fn list_artifacts(
        &self,
        token: &AccessToken,
        container_id: &str,
    ) -> SyncResult<Vec<RemoteArtifact>> {
        let files = self
            .list_files(token, &children_query(container_id, None), "file listing")
            .await?;
        Ok(files.into_iter().map(RemoteArtifact::from).collect())
    }

    async fn find_artifacts(
        &self,
        token: &AccessToken,
        container_id: &str,
        name: &str,
    ) -> SyncResult<Vec<RemoteArtifact>> {
        let files = self
            .list_files(token, &children_query(container_id, Some(name)), "file search")
            .await?;
        Ok(files.into_iter().map(RemoteArtifact::from).collect())
    }

    async fn artifact_metadata(
        &self,
        token: &AccessToken,
        id: &str,
    ) -> SyncResult<RemoteArtifact> {
        let file = self.file_metadata(token, id, &format!("file {id}")).await?;
        Ok(file.into())
    }

    async fn create_artifact(
        &self,
        token: &AccessToken,
        container_id: &str,
        name: &str,
        body: Vec<u8>,
    ) -> SyncResult<RemoteArtifact> {
        let metadata = serde_json::to_vec(&NewFile {
            name,
            mime_type: Some("application/json"),
            parents: vec![container_id],
        })?;

        let request = self
            .request(Method::POST, format!("{}/files", self.upload_base), token)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(multipart_body(&metadata, &body));

        let what = format!("upload of {name}");
        let file: DriveFile = Self::json(self.send(request, &what).await?, &what).await?;
        Ok(file.into())
    }

    async fn overwrite_artifact(
        &self,
        token: &AccessToken,
        id: &str,
        body: Vec<u8>,
    ) -> SyncResult<RemoteArtifact> {
        let request = self
            .request(Method::PATCH, format!("{}/files/{id}", self.upload_base), token)
            .query(&[("uploadType", "media"), ("fields", FILE_FIELDS)])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        let what = format!("file {id}");
        let file: DriveFile = Self::json(self.send(request, &what).await?, &what).await?;
        Ok(file.into())
    }

    async fn fetch_artifact(&self, token: &AccessToken, id: &str) -> SyncResult<Vec<u8>> {
        let request = self
            .request(Method::GET, format!("{}/files/{id}", self.api_base), token)
            .query(&[("alt", "media")]);

        let what = format!("file {id}");
        let bytes = self
            .send(request, &what)
            .await?
            .bytes()
            .await
            .map_err(|e| SyncError::NetworkFailure(format!("{what}: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn delete_artifact(&self, token: &AccessToken, id: &str) -> SyncResult<()> {
        let request = self.request(Method::DELETE, format!("{}/files/{id}", self.api_base), token);
        self.send(request, &format!("file {id}")).await?;
        Ok(())
    }
}
