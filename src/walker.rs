//! Read-only enumeration of the container hierarchy.

use futures::future::{BoxFuture, FutureExt};

use crate::error::{DriveError, Result};
use crate::models::RemoteEntry;
use crate::store::{KindFilter, ListQuery, NewEntry, RemoteStore};

/// How a recursive container listing reports descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalMode {
    /// Descendants are visited but only direct children are returned.
    #[default]
    Flat,
    /// Descendants follow their parent, depth-first pre-order.
    Aggregated,
}

/// Walks containers of a remote store.
///
/// Listing failures are logged and produce an empty result so that one
/// failing branch does not stop a traversal.
pub struct FolderWalker<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    mode: TraversalMode,
}

impl<'a, S: RemoteStore + ?Sized> FolderWalker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            mode: TraversalMode::Flat,
        }
    }

    pub fn with_mode(mut self, mode: TraversalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Containers directly under `container_id`, in store order.
    ///
    /// With `recursive`, every child container is walked in turn. What the
    /// nested walks find is only returned in [`TraversalMode::Aggregated`].
    pub async fn list_child_containers(
        &self,
        container_id: &str,
        recursive: bool,
    ) -> Vec<RemoteEntry> {
        self.walk(container_id, recursive, 0).await
    }

    fn walk<'b>(
        &'b self,
        container_id: &'b str,
        recursive: bool,
        depth: usize,
    ) -> BoxFuture<'b, Vec<RemoteEntry>> {
        async move {
            let query = ListQuery::children_of(container_id).kind(KindFilter::Container);
            let children = match self.store.list(&query).await {
                Ok(children) => children,
                Err(e) => {
                    log::error!("failed to list folders in {}: {}", container_id, e);
                    return Vec::new();
                }
            };
            log::debug!(
                "{}{} folder(s) in {}",
                "  ".repeat(depth),
                children.len(),
                container_id
            );

            if !recursive {
                return children;
            }

            let mut result = Vec::with_capacity(children.len());
            for child in children {
                let nested = self.walk(&child.id, true, depth + 1).await;
                result.push(child);
                if self.mode == TraversalMode::Aggregated {
                    result.extend(nested);
                }
            }
            result
        }
        .boxed()
    }

    /// Non-container entries directly under `container_id`, in store order.
    pub async fn list_child_objects(&self, container_id: &str) -> Vec<RemoteEntry> {
        let query = ListQuery::children_of(container_id).kind(KindFilter::NonContainer);
        match self.store.list(&query).await {
            Ok(entries) => entries
                .into_iter()
                .map(|entry| RemoteEntry {
                    is_container: false,
                    ..entry
                })
                .collect(),
            Err(e) => {
                log::error!("failed to list files in {}: {}", container_id, e);
                Vec::new()
            }
        }
    }

    /// Create a container named `name` under `container_id`.
    pub async fn create_child_container(&self, container_id: &str, name: &str) -> Result<String> {
        if container_id.trim().is_empty() {
            return Err(DriveError::invalid("parent container id is empty"));
        }
        if name.trim().is_empty() {
            return Err(DriveError::invalid("folder name is empty"));
        }

        let id = self
            .store
            .create(&NewEntry::container(name, container_id), None)
            .await?;
        log::info!("created folder {} ({}) in {}", name, id, container_id);
        Ok(id)
    }

    /// Id of the first container named `name` anywhere in the store.
    pub async fn find_container_by_name(&self, name: &str) -> Result<String> {
        let query = ListQuery::named(name).kind(KindFilter::Container);
        self.store
            .list(&query)
            .await?
            .into_iter()
            .next()
            .map(|entry| entry.id)
            .ok_or_else(|| DriveError::NotFound(format!("folder named '{}'", name)))
    }
}
