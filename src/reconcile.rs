//! Idempotent uploads keyed by display name within a container.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{DriveError, Result};
use crate::models::{UploadAction, UploadOutcome};
use crate::store::{EntryPatch, KindFilter, ListQuery, Media, MediaSource, NewEntry, RemoteStore};

/// The body of an upload.
#[derive(Debug, Clone)]
pub enum UploadContent {
    /// A local file, streamed from disk.
    Path(PathBuf),
    /// Bytes already in memory. These need an explicit content type.
    Bytes(Bytes),
}

/// A request to place content in a container.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub content: UploadContent,
    pub target_container_id: String,
    /// Defaults to the local file's base name.
    pub display_name: Option<String>,
    pub content_type: Option<String>,
    /// Update an existing object with the same name instead of adding another.
    pub replace: bool,
}

impl UploadRequest {
    pub fn from_path(path: impl Into<PathBuf>, target_container_id: impl Into<String>) -> Self {
        Self {
            content: UploadContent::Path(path.into()),
            target_container_id: target_container_id.into(),
            display_name: None,
            content_type: None,
            replace: true,
        }
    }

    pub fn from_bytes(
        data: impl Into<Bytes>,
        display_name: impl Into<String>,
        target_container_id: impl Into<String>,
    ) -> Self {
        Self {
            content: UploadContent::Bytes(data.into()),
            target_container_id: target_container_id.into(),
            display_name: Some(display_name.into()),
            content_type: None,
            replace: true,
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Check the request locally and resolve its name and body.
    async fn validate(&self) -> Result<(String, Media)> {
        if self.target_container_id.trim().is_empty() {
            return Err(DriveError::invalid("target container id is empty"));
        }

        let media = match &self.content {
            UploadContent::Path(path) => path_media(path, self.content_type.as_deref()).await?,
            UploadContent::Bytes(data) => {
                let content_type = self
                    .content_type
                    .clone()
                    .ok_or_else(|| DriveError::invalid("missing content type for stream upload"))?;
                Media {
                    content_type,
                    len: data.len() as u64,
                    source: MediaSource::Bytes(data.clone()),
                }
            }
        };

        let name = match (&self.display_name, &self.content) {
            (Some(name), _) => name.clone(),
            (None, UploadContent::Path(path)) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            (None, UploadContent::Bytes(_)) => String::new(),
        };
        if name.is_empty() {
            return Err(DriveError::invalid("display name is empty"));
        }

        Ok((name, media))
    }
}

async fn path_media(path: &Path, content_type: Option<&str>) -> Result<Media> {
    let unreadable =
        |reason: String| DriveError::invalid(format!("{} is not readable: {}", path.display(), reason));

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| unreadable(e.to_string()))?;
    if !metadata.is_file() {
        return Err(unreadable("not a regular file".to_string()));
    }
    // Metadata alone does not prove read permission.
    tokio::fs::File::open(path)
        .await
        .map_err(|e| unreadable(e.to_string()))?;

    let content_type = content_type.map(str::to_string).unwrap_or_else(|| {
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string()
    });

    Ok(Media {
        content_type,
        len: metadata.len(),
        source: MediaSource::Path(path.to_path_buf()),
    })
}

/// Uploads content so that repeated uploads of the same name land on the
/// same remote object.
pub struct Reconciler<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RemoteStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create or update the object named by the request in its target container.
    ///
    /// With `replace` set, the first object in the target whose name matches
    /// (in the store's listing order) is updated in place and attached to the
    /// target; otherwise a new object is created. Nothing touches the store
    /// until the request has been validated.
    pub async fn reconcile_upload(&self, request: &UploadRequest) -> Result<UploadOutcome> {
        let (name, media) = request.validate().await?;
        let target = request.target_container_id.as_str();

        if request.replace {
            let query = ListQuery::children_of(target).kind(KindFilter::NonContainer);
            let existing = self.store.list(&query).await?;

            if let Some(found) = existing.into_iter().find(|entry| entry.name == name) {
                let patch = EntryPatch {
                    name: Some(name.clone()),
                    add_parents: vec![target.to_string()],
                };
                self.store.update(&found.id, &patch, Some(&media)).await?;
                log::info!("updated {} ({}) in {}", name, found.id, target);
                return Ok(UploadOutcome {
                    remote_id: found.id,
                    action: UploadAction::Updated,
                });
            }
        }

        let remote_id = self
            .store
            .create(&NewEntry::object(name.as_str(), target), Some(&media))
            .await?;
        log::info!("created {} ({}) in {}", name, remote_id, target);

        Ok(UploadOutcome {
            remote_id,
            action: UploadAction::Created,
        })
    }
}
