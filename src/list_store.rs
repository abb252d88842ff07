//! Document List Store: the collection shown on the home view.
//!
//! Entries are tagged: a [`ListEntry::Confirmed`] document came from the
//! server, a [`ListEntry::PendingRemoval`] marker hides a document whose
//! delete is still in flight. Reconciliation after a `load()` keeps the
//! markers, so a page fetched mid-delete cannot resurrect the document.
//! Once the server confirms a delete the marker becomes a tombstone tagged
//! with the generation at that moment: pages from loads issued up to then
//! may predate the delete and have the id filtered out. The first page from
//! a later load drops the tombstone.
//!
//! Every `load()` takes a generation ticket when it is issued. A response
//! is applied only if its ticket is still the latest; anything older is
//! dropped and reported as [`LoadOutcome::Stale`].

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::error::RemoteError;
use crate::lock;
use crate::models::{Document, DocumentPage, ListQuery, LoadOutcome, LoadState, PageInfo};
use crate::transport::Transport;

/// One slot of the list.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry {
    Confirmed(Document),
    PendingRemoval { id: String },
}

impl ListEntry {
    pub fn id(&self) -> &str {
        match self {
            ListEntry::Confirmed(doc) => &doc.id,
            ListEntry::PendingRemoval { id } => id,
        }
    }

    pub fn is_pending_removal(&self) -> bool {
        matches!(self, ListEntry::PendingRemoval { .. })
    }
}

/// Point-in-time view of the store for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot {
    /// Visible documents, in server order.
    pub documents: Vec<Document>,
    pub load_state: LoadState,
    pub page: Option<PageInfo>,
}

#[derive(Debug, Default)]
struct ListState {
    entries: Vec<ListEntry>,
    load_state: LoadState,
    generation: u64,
    page: Option<PageInfo>,
    query: ListQuery,
    /// Confirmed deletes, keyed by id, with the generation current at
    /// confirmation.
    tombstones: HashMap<String, u64>,
}

impl ListState {
    fn pending_ids(&self) -> HashSet<String> {
        self.entries
            .iter()
            .filter(|e| e.is_pending_removal())
            .map(|e| e.id().to_string())
            .collect()
    }

    fn drop_marker(&mut self, id: &str) {
        self.entries
            .retain(|e| !(e.is_pending_removal() && e.id() == id));
    }
}

pub struct DocumentListStore {
    transport: Arc<dyn Transport>,
    state: Mutex<ListState>,
}

impl DocumentListStore {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_query(transport, ListQuery::default())
    }

    pub fn with_query(transport: Arc<dyn Transport>, query: ListQuery) -> Self {
        Self {
            transport,
            state: Mutex::new(ListState {
                query,
                ..Default::default()
            }),
        }
    }

    /// Fetch the current query's page and replace the collection with it.
    ///
    /// The store enters `Loading` as soon as this is called, before the
    /// returned future is polled. On failure the previous collection stays
    /// visible and the store holds `Error(message)`.
    pub fn load(&self) -> impl Future<Output = Result<LoadOutcome, RemoteError>> + Send + '_ {
        let (ticket, query) = self.begin_load(None);
        self.finish_load(ticket, query)
    }

    /// Like [`load`](Self::load), but replaces the stored query first.
    pub fn load_with(
        &self,
        query: ListQuery,
    ) -> impl Future<Output = Result<LoadOutcome, RemoteError>> + Send + '_ {
        let (ticket, query) = self.begin_load(Some(query));
        self.finish_load(ticket, query)
    }

    fn begin_load(&self, query: Option<ListQuery>) -> (u64, ListQuery) {
        let mut state = lock(&self.state);
        if let Some(query) = query {
            state.query = query;
        }
        state.generation += 1;
        state.load_state = LoadState::Loading;
        (state.generation, state.query.clone())
    }

    async fn finish_load(&self, ticket: u64, query: ListQuery) -> Result<LoadOutcome, RemoteError> {
        let result = self.transport.list_documents(&query).await;
        self.apply_page(ticket, result)
    }

    fn apply_page(
        &self,
        ticket: u64,
        result: Result<DocumentPage, RemoteError>,
    ) -> Result<LoadOutcome, RemoteError> {
        let mut state = lock(&self.state);
        if ticket != state.generation {
            tracing::debug!(
                generation = ticket,
                current = state.generation,
                "discarding stale document list response"
            );
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(page) => {
                let info = page.info();
                state.tombstones.retain(|_, confirmed_at| *confirmed_at >= ticket);
                let pending = state.pending_ids();
                let tombstones = &state.tombstones;
                let mut entries: Vec<ListEntry> = page
                    .documents
                    .into_iter()
                    .filter(|doc| !tombstones.contains_key(&doc.id))
                    .map(|doc| {
                        if pending.contains(&doc.id) {
                            ListEntry::PendingRemoval { id: doc.id }
                        } else {
                            ListEntry::Confirmed(doc)
                        }
                    })
                    .collect();
                let kept: HashSet<String> = entries.iter().map(|e| e.id().to_string()).collect();
                entries.extend(
                    pending
                        .into_iter()
                        .filter(|id| !kept.contains(id))
                        .map(|id| ListEntry::PendingRemoval { id }),
                );

                state.entries = entries;
                state.page = Some(info);
                state.load_state = LoadState::Idle;
                Ok(LoadOutcome::Applied)
            }
            Err(err) => {
                state.load_state = LoadState::Error(err.message.clone());
                Err(err)
            }
        }
    }

    /// Prepend a document the server has already confirmed (post-upload).
    ///
    /// An existing entry with the same id is replaced, so the collection
    /// never holds duplicates.
    pub fn insert_optimistic(&self, doc: Document) {
        let mut state = lock(&self.state);
        state.entries.retain(|e| e.id() != doc.id);
        state.entries.insert(0, ListEntry::Confirmed(doc));
    }

    /// Hide the document immediately, then delete it on the server.
    ///
    /// The document disappears from [`documents`](Self::documents) as soon
    /// as this is called. Whatever the outcome the marker is dropped; a
    /// failure is not rolled back but leaves the store in `Error(message)`
    /// until the next successful `load()`. A confirmed delete also hides the
    /// id from pages of loads that were already in flight.
    pub fn remove_optimistic(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send + '_ {
        let id = id.to_string();
        {
            let mut state = lock(&self.state);
            let marker = ListEntry::PendingRemoval { id: id.clone() };
            match state.entries.iter().position(|e| e.id() == id) {
                Some(pos) => state.entries[pos] = marker,
                None => state.entries.push(marker),
            }
        }

        async move {
            let result = self.transport.delete_document(&id).await;
            let mut state = lock(&self.state);
            state.drop_marker(&id);
            match result {
                Ok(()) => {
                    let generation = state.generation;
                    state.tombstones.insert(id.clone(), generation);
                    tracing::info!(document_id = %id, "document deleted");
                    Ok(())
                }
                Err(err) => {
                    state.load_state = LoadState::Error(err.message.clone());
                    Err(err)
                }
            }
        }
    }

    /// Visible documents, in order.
    pub fn documents(&self) -> Vec<Document> {
        lock(&self.state)
            .entries
            .iter()
            .filter_map(|e| match e {
                ListEntry::Confirmed(doc) => Some(doc.clone()),
                ListEntry::PendingRemoval { .. } => None,
            })
            .collect()
    }

    /// Every entry, including pending-removal markers.
    pub fn entries(&self) -> Vec<ListEntry> {
        lock(&self.state).entries.clone()
    }

    pub fn load_state(&self) -> LoadState {
        lock(&self.state).load_state.clone()
    }

    pub fn page_info(&self) -> Option<PageInfo> {
        lock(&self.state).page
    }

    pub fn query(&self) -> ListQuery {
        lock(&self.state).query.clone()
    }

    /// Ids whose delete is still in flight.
    pub fn pending_removals(&self) -> Vec<String> {
        lock(&self.state)
            .entries
            .iter()
            .filter(|e| e.is_pending_removal())
            .map(|e| e.id().to_string())
            .collect()
    }

    /// Documents, load state and page info read under one lock.
    pub fn snapshot(&self) -> ListSnapshot {
        let state = lock(&self.state);
        ListSnapshot {
            documents: state
                .entries
                .iter()
                .filter_map(|e| match e {
                    ListEntry::Confirmed(doc) => Some(doc.clone()),
                    ListEntry::PendingRemoval { .. } => None,
                })
                .collect(),
            load_state: state.load_state.clone(),
            page: state.page,
        }
    }
}
