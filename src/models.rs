//! Data models shared by the store, the reconciler and the walker, plus the
//! Drive API wire types.

use serde::{Deserialize, Serialize};

/// Mime type Drive uses to mark a folder.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// An entry in the remote hierarchy, container or leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    pub is_container: bool,
}

impl RemoteEntry {
    pub fn container(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_container: true,
        }
    }

    pub fn object(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_container: false,
        }
    }
}

impl std::fmt::Display for RemoteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_container { "dir" } else { "file" };
        write!(f, "{}\t{}\t{}", self.id, kind, self.name)
    }
}

/// What `reconcile_upload` did to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadAction {
    Created,
    Updated,
}

impl std::fmt::Display for UploadAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadAction::Created => f.write_str("created"),
            UploadAction::Updated => f.write_str("updated"),
        }
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub remote_id: String,
    pub action: UploadAction,
}

/// Metadata for a file or folder as returned by the Drive API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
}

impl FileMetadata {
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

impl From<FileMetadata> for RemoteEntry {
    fn from(meta: FileMetadata) -> Self {
        let is_container = meta.is_folder();
        RemoteEntry {
            id: meta.id,
            name: meta.name,
            is_container,
        }
    }
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// Response from the files.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<FileMetadata>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Service account credentials document.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: Option<String>,
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
        assert_eq!(format_size(1073741824), "1.00 GB");
        assert_eq!(format_size(5 * 1073741824 * 1024), "5120.00 GB");
    }

    #[test]
    fn test_folder_metadata_becomes_container() {
        let json = r#"{
            "id": "dir1",
            "name": "reports",
            "mimeType": "application/vnd.google-apps.folder"
        }"#;

        let metadata: FileMetadata = serde_json::from_str(json).unwrap();
        let entry = RemoteEntry::from(metadata);
        assert_eq!(entry, RemoteEntry::container("dir1", "reports"));
    }

    #[test]
    fn test_file_metadata_becomes_object() {
        let json = r#"{
            "id": "abc123",
            "name": "test.txt",
            "mimeType": "text/plain",
            "size": "1024"
        }"#;

        let metadata: FileMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.size, Some(1024));
        assert!(!metadata.is_folder());

        let entry = RemoteEntry::from(metadata);
        assert!(!entry.is_container);
        assert_eq!(entry.name, "test.txt");
    }

    #[test]
    fn test_remote_entry_display() {
        let display = format!("{}", RemoteEntry::container("d1", "Archive"));
        assert_eq!(display, "d1\tdir\tArchive");
    }
}
