//! # chunkscope
//!
//! Client-side lifecycle controller for a document-chunking service.
//!
//! chunkscope keeps the local view of a remote document store consistent
//! while the user uploads files with splitter parameters, browses the
//! resulting chunks and deletes documents. All state lives in three
//! independent stores that share one [`transport::Transport`]; responses
//! that arrive after a newer request was issued are discarded instead of
//! overwriting fresher state.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐    ┌────────────────────┐
//! │   params   │───▶│ UploadOrchestrator │
//! └────────────┘    └─────────┬──────────┘
//!                             │ insert_optimistic
//!                             ▼
//!                   ┌────────────────────┐   ┌─────────────────────┐
//!                   │ DocumentListStore  │   │ DocumentDetailStore │
//!                   └─────────┬──────────┘   └──────────┬──────────┘
//!                             └───────────┬─────────────┘
//!                                         ▼
//!                             ┌───────────────────────┐
//!                             │ Transport (HTTP/mem)  │
//!                             └───────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! chunkscope splitters              # recommended parameters per extension
//! chunkscope upload ./report.pdf    # upload with recommended parameters
//! chunkscope list                   # newest documents first
//! chunkscope show <id>              # parameters and chunks
//! chunkscope delete <id>
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Wire types and store states |
//! | [`error`] | Error taxonomy |
//! | [`params`] | Splitter parameter resolution and validation |
//! | [`transport`] | Service API: HTTP and in-memory implementations |
//! | [`list_store`] | Document list with optimistic insert/remove |
//! | [`detail_store`] | Single document, chunks and selection |
//! | [`upload`] | Upload state machine |
//! | [`session`] | Transport and stores for one session |
//! | [`commands`] | CLI renderers |
//! | [`logging`] | Tracing subscriber setup |

pub mod commands;
pub mod config;
pub mod detail_store;
pub mod error;
pub mod list_store;
pub mod logging;
pub mod models;
pub mod params;
pub mod session;
pub mod transport;
pub mod upload;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a store mutex. Critical sections are plain field updates, so a
/// poisoned lock still holds consistent state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
