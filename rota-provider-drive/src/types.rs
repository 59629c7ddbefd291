//! Drive v3 wire types.

use chrono::{DateTime, Utc};
use rota_core::remote::{RemoteArtifact, RemoteContainer, SharedSpace};
use serde::{Deserialize, Serialize};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Fields requested for every file resource.
pub const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime,size,shared,driveId,ownedByMe,trashed";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    pub modified_time: Option<DateTime<Utc>>,
    /// int64 values arrive as strings.
    pub size: Option<String>,
    #[serde(default)]
    pub shared: bool,
    pub drive_id: Option<String>,
    #[serde(default)]
    pub owned_by_me: bool,
    #[serde(default)]
    pub trashed: bool,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

impl From<DriveFile> for RemoteContainer {
    fn from(file: DriveFile) -> Self {
        RemoteContainer {
            id: file.id,
            name: file.name,
            space_id: file.drive_id,
            is_shared: file.shared,
            owned_by_current_principal: file.owned_by_me,
            last_modified_at: file.modified_time,
        }
    }
}

impl From<DriveFile> for RemoteArtifact {
    fn from(file: DriveFile) -> Self {
        RemoteArtifact {
            size_bytes: file.size.as_deref().and_then(|s| s.parse().ok()),
            id: file.id,
            name: file.name,
            last_modified_at: file.modified_time,
            space_id: file.drive_id,
            is_shared: file.shared,
            owned_by_current_principal: file.owned_by_me,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SharedDrive {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl From<SharedDrive> for SharedSpace {
    fn from(drive: SharedDrive) -> Self {
        SharedSpace {
            id: drive.id,
            name: drive.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveList {
    #[serde(default)]
    pub drives: Vec<SharedDrive>,
    pub next_page_token: Option<String>,
}

/// Metadata body for folder and file creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shared_drive_folder_becomes_shared_space_container() {
        let file: DriveFile = serde_json::from_value(json!({
            "id": "f1",
            "name": "Rota Sync",
            "mimeType": FOLDER_MIME_TYPE,
            "modifiedTime": "2025-03-01T10:00:00.000Z",
            "driveId": "0AB",
            "ownedByMe": false
        }))
        .unwrap();
        assert!(file.is_folder());

        let container = RemoteContainer::from(file);
        assert!(container.is_in_shared_space());
        assert_eq!(container.space_id.as_deref(), Some("0AB"));
        assert!(!container.owned_by_current_principal);
        assert!(container.last_modified_at.is_some());
    }

    #[test]
    fn test_artifact_size_parses_from_string() {
        let file: DriveFile = serde_json::from_value(json!({
            "id": "f2",
            "name": "rota-shared.json",
            "mimeType": "application/json",
            "size": "2048",
            "shared": true
        }))
        .unwrap();

        let artifact = RemoteArtifact::from(file);
        assert_eq!(artifact.size_bytes, Some(2048));
        assert!(artifact.is_shared);
        assert_eq!(artifact.space_id, None);
    }

    #[test]
    fn test_new_folder_metadata_omits_empty_parents() {
        let body = serde_json::to_value(NewFile {
            name: "Rota Sync",
            mime_type: Some(FOLDER_MIME_TYPE),
            parents: vec![],
        })
        .unwrap();

        assert_eq!(
            body,
            json!({"name": "Rota Sync", "mimeType": FOLDER_MIME_TYPE})
        );
    }
}
