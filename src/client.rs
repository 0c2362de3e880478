//! Google Drive v3 implementation of [`RemoteStore`].

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;

use crate::auth::Authenticator;
use crate::error::{DriveError, Result};
use crate::models::{
    ApiErrorResponse, FileListResponse, FileMetadata, RemoteEntry, FOLDER_MIME_TYPE,
};
use crate::store::{
    ContentStream, EntryPatch, KindFilter, ListQuery, Media, MediaSource, NewEntry, RemoteStore,
};

/// Base URL for Google Drive API v3.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload URL for Google Drive API.
const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Default threshold for resumable upload (500 MB).
const RESUMABLE_THRESHOLD: u64 = 500 * 1024 * 1024;

const LIST_FIELDS: &str = "nextPageToken, files(id, name, size, mimeType)";
const FILE_FIELDS: &str = "id, name, size, mimeType";

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

/// Drive API client. Works against My Drive and, when a drive id is set,
/// a single Shared Drive.
pub struct DriveClient {
    auth: Authenticator,
    http: Client,
    drive_id: Option<String>,
    api_base: String,
    upload_base: String,
    resumable_threshold: u64,
}

impl DriveClient {
    pub fn new(auth: Authenticator) -> Self {
        Self {
            auth,
            http: Client::new(),
            drive_id: None,
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: UPLOAD_API_BASE.to_string(),
            resumable_threshold: RESUMABLE_THRESHOLD,
        }
    }

    /// Restrict listings to one Shared Drive.
    pub fn with_drive_id(mut self, drive_id: impl Into<String>) -> Self {
        self.drive_id = Some(drive_id.into());
        self
    }

    /// Point the client at another API host.
    pub fn with_base_urls(
        mut self,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into();
        self.upload_base = upload_base.into();
        self
    }

    /// Send media larger than `bytes` through a resumable session.
    pub fn with_resumable_threshold(mut self, bytes: u64) -> Self {
        self.resumable_threshold = bytes;
        self
    }

    /// Get file metadata by ID.
    pub async fn get_file(&self, file_id: &str) -> Result<FileMetadata> {
        let request = self
            .request(Method::GET, format!("{}/files/{}", self.api_base, file_id))
            .await?
            .query(&[("supportsAllDrives", "true"), ("fields", FILE_FIELDS)]);

        let response = check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn request(&self, method: Method, url: String) -> Result<RequestBuilder> {
        let token = self.auth.get_access_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    /// Send metadata plus content, choosing multipart or resumable by size.
    async fn send_media(
        &self,
        method: Method,
        url: String,
        metadata: &Value,
        media: &Media,
        extra_query: &[(&str, String)],
    ) -> Result<String> {
        if media.len > self.resumable_threshold {
            return self
                .send_resumable(method, url, metadata, media, extra_query)
                .await;
        }

        let metadata_part = Part::text(metadata.to_string()).mime_str("application/json")?;
        let data = media.read_all().await?;
        let length = data.len() as u64;
        let file_part =
            Part::stream_with_length(data, length).mime_str(&media.content_type)?;
        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let request = self
            .request(method, url)
            .await?
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", "id"),
            ])
            .query(extra_query)
            .multipart(form);

        let created: IdResponse = check(request.send().await?).await?.json().await?;
        Ok(created.id)
    }

    async fn send_resumable(
        &self,
        method: Method,
        url: String,
        metadata: &Value,
        media: &Media,
        extra_query: &[(&str, String)],
    ) -> Result<String> {
        // Step 1: open the upload session
        let init = self
            .request(method, url)
            .await?
            .query(&[("uploadType", "resumable"), ("supportsAllDrives", "true")])
            .query(extra_query)
            .header("X-Upload-Content-Type", &media.content_type)
            .header("X-Upload-Content-Length", media.len.to_string())
            .json(metadata);
        let init_response = check(init.send().await?).await?;

        let session_url = init_response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| DriveError::ApiError {
                status: init_response.status().as_u16(),
                message: "No upload URL in response".to_string(),
            })?
            .to_string();

        // Step 2: send the bytes
        let body = match &media.source {
            MediaSource::Bytes(data) => Body::from(data.clone()),
            MediaSource::Path(path) => {
                let file = tokio::fs::File::open(path).await?;
                Body::wrap_stream(ReaderStream::new(file))
            }
        };
        log::debug!("streaming {} bytes to upload session", media.len);

        let upload = self
            .http
            .put(&session_url)
            .header("Content-Type", &media.content_type)
            .header("Content-Length", media.len.to_string())
            .query(&[("fields", "id")])
            .body(body);

        let created: IdResponse = check(upload.send().await?).await?.json().await?;
        Ok(created.id)
    }
}

/// Build a Drive search expression for a listing.
pub fn drive_query(query: &ListQuery) -> String {
    let mut clauses = Vec::new();
    if let Some(parent) = &query.parent_id {
        clauses.push(format!("'{}' in parents", escape(parent)));
    }
    if let Some(name) = &query.name {
        clauses.push(format!("name = '{}'", escape(name)));
    }
    match query.kind {
        KindFilter::Any => {}
        KindFilter::Container => clauses.push(format!("mimeType = '{}'", FOLDER_MIME_TYPE)),
        KindFilter::NonContainer => clauses.push(format!("mimeType != '{}'", FOLDER_MIME_TYPE)),
    }
    if query.exclude_trashed {
        clauses.push("trashed = false".to_string());
    }
    clauses.join(" and ")
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Turn a non-2xx response into an `ApiError`.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return Err(DriveError::ApiError {
            status: api_error.error.code,
            message: api_error.error.message,
        });
    }
    Err(DriveError::ApiError {
        status: status.as_u16(),
        message: error_body,
    })
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn list(&self, query: &ListQuery) -> Result<Vec<RemoteEntry>> {
        let q = drive_query(query);
        log::debug!("files.list q={}", q);

        let corpora = match &self.drive_id {
            Some(_) => "drive",
            None => "allDrives",
        };
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .request(Method::GET, format!("{}/files", self.api_base))
                .await?
                .query(&[
                    ("q", q.as_str()),
                    ("corpora", corpora),
                    ("includeItemsFromAllDrives", "true"),
                    ("supportsAllDrives", "true"),
                    ("fields", LIST_FIELDS),
                ]);

            if let Some(drive_id) = &self.drive_id {
                request = request.query(&[("driveId", drive_id)]);
            }
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: FileListResponse = check(request.send().await?).await?.json().await?;
            entries.extend(page.files.into_iter().map(RemoteEntry::from));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(entries)
    }

    async fn create(&self, entry: &NewEntry, media: Option<&Media>) -> Result<String> {
        let mut metadata = json!({
            "name": entry.name,
            "parents": entry.parents,
        });
        if entry.is_container {
            metadata["mimeType"] = json!(FOLDER_MIME_TYPE);
        }
        log::debug!("files.create {}", metadata);

        if let Some(media) = media {
            let url = format!("{}/files", self.upload_base);
            return self.send_media(Method::POST, url, &metadata, media, &[]).await;
        }

        let request = self
            .request(Method::POST, format!("{}/files", self.api_base))
            .await?
            .query(&[("supportsAllDrives", "true"), ("fields", "id")])
            .json(&metadata);

        let created: IdResponse = check(request.send().await?).await?.json().await?;
        Ok(created.id)
    }

    async fn update(&self, id: &str, patch: &EntryPatch, media: Option<&Media>) -> Result<String> {
        let mut metadata = json!({});
        if let Some(name) = &patch.name {
            metadata["name"] = json!(name);
        }
        let mut extra_query = Vec::new();
        if !patch.add_parents.is_empty() {
            extra_query.push(("addParents", patch.add_parents.join(",")));
        }
        log::debug!("files.update {} {}", id, metadata);

        if let Some(media) = media {
            let url = format!("{}/files/{}", self.upload_base, id);
            return self
                .send_media(Method::PATCH, url, &metadata, media, &extra_query)
                .await;
        }

        let request = self
            .request(Method::PATCH, format!("{}/files/{}", self.api_base, id))
            .await?
            .query(&[("supportsAllDrives", "true"), ("fields", "id")])
            .query(&extra_query)
            .json(&metadata);

        let updated: IdResponse = check(request.send().await?).await?.json().await?;
        Ok(updated.id)
    }

    async fn get_content(&self, id: &str) -> Result<ContentStream> {
        let request = self
            .request(Method::GET, format!("{}/files/{}", self.api_base, id))
            .await?
            .query(&[("alt", "media"), ("supportsAllDrives", "true")]);

        let response = check(request.send().await?).await?;
        Ok(ContentStream {
            total: response.content_length(),
            chunks: response
                .bytes_stream()
                .map(|chunk| chunk.map_err(DriveError::from))
                .boxed(),
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let request = self
            .request(Method::DELETE, format!("{}/files/{}", self.api_base, id))
            .await?
            .query(&[("supportsAllDrives", "true")]);

        check(request.send().await?).await?;
        Ok(())
    }
}
