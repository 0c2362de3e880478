//! In-memory `RemoteStore` used by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};

use drive_reconcile::error::{DriveError, Result};
use drive_reconcile::store::{ContentStream, EntryPatch, ListQuery, Media, NewEntry};
use drive_reconcile::{RemoteEntry, RemoteStore};

/// A store call, recorded in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(ListQuery),
    Create(String),
    Update(String),
    GetContent(String),
    Delete(String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Call::Create(_) | Call::Update(_) | Call::Delete(_))
    }
}

#[derive(Debug, Clone)]
struct Stored {
    id: String,
    name: String,
    parents: Vec<String>,
    is_container: bool,
    content: Bytes,
    trashed: bool,
}

#[derive(Default)]
struct State {
    entries: Vec<Stored>,
    next_id: u64,
    calls: Vec<Call>,
    failing_lists: HashSet<String>,
    fail_mutations: bool,
}

pub struct MemoryStore {
    state: Mutex<State>,
    chunk_size: usize,
    report_total: bool,
    advertised_total: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            chunk_size: 4,
            report_total: true,
            advertised_total: None,
        }
    }

    /// Serve content without a known length.
    pub fn without_total(mut self) -> Self {
        self.report_total = false;
        self
    }

    /// Announce `total` bytes for every download, whatever the real length.
    pub fn with_advertised_total(mut self, total: u64) -> Self {
        self.advertised_total = Some(total);
        self
    }

    fn insert(&self, name: &str, parent: &str, is_container: bool, content: Bytes) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("id{}", state.next_id);
        state.entries.push(Stored {
            id: id.clone(),
            name: name.to_string(),
            parents: vec![parent.to_string()],
            is_container,
            content,
            trashed: false,
        });
        id
    }

    pub fn add_container(&self, name: &str, parent: &str) -> String {
        self.insert(name, parent, true, Bytes::new())
    }

    pub fn add_object(&self, name: &str, parent: &str, content: &[u8]) -> String {
        self.insert(name, parent, false, Bytes::copy_from_slice(content))
    }

    pub fn trash(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) {
            entry.trashed = true;
        }
    }

    pub fn fail_list_for(&self, parent: &str) {
        self.state.lock().unwrap().failing_lists.insert(parent.to_string());
    }

    pub fn fail_mutations(&self) {
        self.state.lock().unwrap().fail_mutations = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn parents_of(&self, id: &str) -> Vec<String> {
        self.find(id).map(|e| e.parents).unwrap_or_default()
    }

    pub fn content_of(&self, id: &str) -> Option<Bytes> {
        self.find(id).map(|e| e.content)
    }

    pub fn name_of(&self, id: &str) -> Option<String> {
        self.find(id).map(|e| e.name)
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    fn find(&self, id: &str) -> Option<Stored> {
        let state = self.state.lock().unwrap();
        state.entries.iter().find(|e| e.id == id).cloned()
    }

    fn mutation_failure() -> DriveError {
        DriveError::ApiError {
            status: 403,
            message: "The user's Drive storage quota has been exceeded.".to_string(),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list(&self, query: &ListQuery) -> Result<Vec<RemoteEntry>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List(query.clone()));

        if let Some(parent) = &query.parent_id {
            if state.failing_lists.contains(parent) {
                return Err(DriveError::ApiError {
                    status: 500,
                    message: "Internal Error".to_string(),
                });
            }
        }

        Ok(state
            .entries
            .iter()
            .filter(|e| match &query.parent_id {
                Some(parent) => e.parents.contains(parent),
                None => true,
            })
            .filter(|e| query.name.as_ref().map_or(true, |n| &e.name == n))
            .filter(|e| query.kind.matches(e.is_container))
            .filter(|e| !(query.exclude_trashed && e.trashed))
            .map(|e| RemoteEntry {
                id: e.id.clone(),
                name: e.name.clone(),
                is_container: e.is_container,
            })
            .collect())
    }

    async fn create(&self, entry: &NewEntry, media: Option<&Media>) -> Result<String> {
        let content = match media {
            Some(media) => media.read_all().await?,
            None => Bytes::new(),
        };

        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create(entry.name.clone()));
        if state.fail_mutations {
            return Err(Self::mutation_failure());
        }

        state.next_id += 1;
        let id = format!("id{}", state.next_id);
        state.entries.push(Stored {
            id: id.clone(),
            name: entry.name.clone(),
            parents: entry.parents.clone(),
            is_container: entry.is_container,
            content,
            trashed: false,
        });
        Ok(id)
    }

    async fn update(&self, id: &str, patch: &EntryPatch, media: Option<&Media>) -> Result<String> {
        let content = match media {
            Some(media) => Some(media.read_all().await?),
            None => None,
        };

        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update(id.to_string()));
        if state.fail_mutations {
            return Err(Self::mutation_failure());
        }

        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| DriveError::ApiError {
                status: 404,
                message: format!("File not found: {}", id),
            })?;
        if let Some(name) = &patch.name {
            entry.name = name.clone();
        }
        for parent in &patch.add_parents {
            if !entry.parents.contains(parent) {
                entry.parents.push(parent.clone());
            }
        }
        if let Some(content) = content {
            entry.content = content;
        }
        Ok(id.to_string())
    }

    async fn get_content(&self, id: &str) -> Result<ContentStream> {
        let content = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::GetContent(id.to_string()));
            state
                .entries
                .iter()
                .find(|e| e.id == id)
                .map(|e| e.content.clone())
                .ok_or_else(|| DriveError::ApiError {
                    status: 404,
                    message: format!("File not found: {}", id),
                })?
        };

        let chunks: Vec<Result<Bytes>> = content
            .chunks(self.chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(ContentStream {
            total: self
                .advertised_total
                .or(self.report_total.then_some(content.len() as u64)),
            chunks: stream::iter(chunks).boxed(),
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(id.to_string()));
        if state.fail_mutations {
            return Err(Self::mutation_failure());
        }
        state.entries.retain(|e| e.id != id);
        Ok(())
    }
}
