//! Document Detail Store: the single in-focus document, its chunks and
//! the chunk selection.
//!
//! Responses are keyed by both a generation ticket and the requested id.
//! Navigating to another document, reloading, or calling
//! [`clear`](DocumentDetailStore::clear) bumps the generation, so a response
//! for an abandoned request is dropped instead of overwriting the view.

use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::error::{RemoteError, SelectionError};
use crate::lock;
use crate::models::{Chunk, DocumentDetail, LoadOutcome, LoadState};
use crate::transport::Transport;

/// Point-in-time view of the store for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailSnapshot {
    pub detail: Option<DocumentDetail>,
    pub selection: Option<String>,
    pub load_state: LoadState,
}

#[derive(Debug, Default)]
struct DetailState {
    requested: Option<String>,
    generation: u64,
    detail: Option<DocumentDetail>,
    selection: Option<String>,
    load_state: LoadState,
}

pub struct DocumentDetailStore {
    transport: Arc<dyn Transport>,
    state: Mutex<DetailState>,
}

impl DocumentDetailStore {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: Mutex::new(DetailState::default()),
        }
    }

    /// Fetch `id` with its chunks.
    ///
    /// Takes effect when called: the selection is cleared, the store enters
    /// `Loading`, and a detail for a different document is dropped so it can
    /// never flash under the new id. On success the first chunk (if any) is
    /// selected.
    pub fn load(&self, id: &str) -> impl Future<Output = Result<LoadOutcome, RemoteError>> + Send + '_ {
        let id = id.to_string();
        let ticket = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.load_state = LoadState::Loading;
            state.selection = None;
            if state.detail.as_ref().is_some_and(|d| d.id() != id) {
                state.detail = None;
            }
            state.requested = Some(id.clone());
            state.generation
        };

        async move {
            let result = self.transport.get_document(&id).await;
            self.apply(ticket, &id, result)
        }
    }

    fn apply(
        &self,
        ticket: u64,
        id: &str,
        result: Result<DocumentDetail, RemoteError>,
    ) -> Result<LoadOutcome, RemoteError> {
        let mut state = lock(&self.state);
        if ticket != state.generation || state.requested.as_deref() != Some(id) {
            tracing::debug!(
                document_id = %id,
                generation = ticket,
                current = state.generation,
                "discarding stale document detail response"
            );
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(detail) => {
                state.selection = detail.chunks.first().map(|c| c.id.clone());
                state.detail = Some(detail);
                state.load_state = LoadState::Idle;
                Ok(LoadOutcome::Applied)
            }
            Err(err) => {
                state.load_state = LoadState::Error(err.message.clone());
                Err(err)
            }
        }
    }

    /// Reset detail, selection and error; in-flight loads become stale.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        let generation = state.generation + 1;
        *state = DetailState {
            generation,
            ..Default::default()
        };
    }

    /// Highlight a chunk of the loaded document. No network call.
    pub fn select_chunk(&self, chunk_id: &str) -> Result<(), SelectionError> {
        let mut state = lock(&self.state);
        let known = state
            .detail
            .as_ref()
            .is_some_and(|d| d.chunk(chunk_id).is_some());
        if !known {
            return Err(SelectionError::InvalidSelection {
                chunk_id: chunk_id.to_string(),
            });
        }
        state.selection = Some(chunk_id.to_string());
        Ok(())
    }

    pub fn detail(&self) -> Option<DocumentDetail> {
        lock(&self.state).detail.clone()
    }

    pub fn selection(&self) -> Option<String> {
        lock(&self.state).selection.clone()
    }

    pub fn selected_chunk(&self) -> Option<Chunk> {
        let state = lock(&self.state);
        let selection = state.selection.as_deref()?;
        state.detail.as_ref()?.chunk(selection).cloned()
    }

    pub fn load_state(&self) -> LoadState {
        lock(&self.state).load_state.clone()
    }

    /// The id of the most recent `load`, until `clear`.
    pub fn requested_id(&self) -> Option<String> {
        lock(&self.state).requested.clone()
    }

    pub fn snapshot(&self) -> DetailSnapshot {
        let state = lock(&self.state);
        DetailSnapshot {
            detail: state.detail.clone(),
            selection: state.selection.clone(),
            load_state: state.load_state.clone(),
        }
    }
}
