//! The remote store abstraction the reconciler and walker are written against.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::models::RemoteEntry;

/// Which kinds of entries a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    Any,
    Container,
    NonContainer,
}

impl KindFilter {
    pub fn matches(self, is_container: bool) -> bool {
        match self {
            KindFilter::Any => true,
            KindFilter::Container => is_container,
            KindFilter::NonContainer => !is_container,
        }
    }
}

/// Parameters of a `list` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub kind: KindFilter,
    pub exclude_trashed: bool,
}

impl ListQuery {
    /// Direct children of `parent_id`, trashed entries excluded.
    pub fn children_of(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            exclude_trashed: true,
            ..Self::default()
        }
    }

    /// Entries anywhere in the store with exactly this name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            exclude_trashed: true,
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: KindFilter) -> Self {
        self.kind = kind;
        self
    }
}

/// Metadata for a `create` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub name: String,
    pub parents: Vec<String>,
    pub is_container: bool,
}

impl NewEntry {
    pub fn object(name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: vec![parent_id.into()],
            is_container: false,
        }
    }

    pub fn container(name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            is_container: true,
            ..Self::object(name, parent_id)
        }
    }
}

/// Metadata changes for an `update` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub name: Option<String>,
    /// Containers to attach the entry to, in addition to its current parents.
    pub add_parents: Vec<String>,
}

/// Where upload bytes come from.
#[derive(Debug, Clone)]
pub enum MediaSource {
    Path(PathBuf),
    Bytes(Bytes),
}

/// A validated upload body.
#[derive(Debug, Clone)]
pub struct Media {
    pub content_type: String,
    pub len: u64,
    pub source: MediaSource,
}

impl Media {
    /// Read the whole body into memory.
    pub async fn read_all(&self) -> Result<Bytes> {
        match &self.source {
            MediaSource::Bytes(data) => Ok(data.clone()),
            MediaSource::Path(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
        }
    }
}

/// Content of a remote object as a sequence of chunks.
pub struct ContentStream {
    /// Total length when the store reports it.
    pub total: Option<u64>,
    pub chunks: BoxStream<'static, Result<Bytes>>,
}

/// Operations a remote object store must offer.
///
/// Implementations perform one remote round trip per call and never retry.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List entries matching `query`, in the store's own order.
    async fn list(&self, query: &ListQuery) -> Result<Vec<RemoteEntry>>;

    /// Create an entry, returning its id.
    async fn create(&self, entry: &NewEntry, media: Option<&Media>) -> Result<String>;

    /// Update an existing entry's metadata and optionally its content.
    async fn update(&self, id: &str, patch: &EntryPatch, media: Option<&Media>) -> Result<String>;

    /// Open the content of an object for reading.
    async fn get_content(&self, id: &str) -> Result<ContentStream>;

    /// Remove an entry.
    async fn delete(&self, id: &str) -> Result<()>;
}
