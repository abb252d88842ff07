//! Transport abstraction over the document service API.
//!
//! The [`Transport`] trait has one method per server interaction. Every
//! method either yields the typed payload or fails with a [`RemoteError`];
//! nothing is retried here. Callers treat a failure as terminal for that
//! attempt.
//!
//! Implementations:
//! - **[`HttpTransport`]**: talks to a live server with `reqwest`.
//! - **[`InMemoryTransport`]**: in-process service model for tests and
//!   offline embedding.
//!
//! # Endpoints
//!
//! | Method | HTTP |
//! |--------|------|
//! | [`list_documents`](Transport::list_documents) | `GET /documents?page&per_page[&status][&content_type]` |
//! | [`get_document`](Transport::get_document) | `GET /documents/{id}` |
//! | [`get_chunk`](Transport::get_chunk) | `GET /documents/{id}/chunks/{chunk_id}` |
//! | [`upload_document`](Transport::upload_document) | `POST /documents/upload` (multipart) |
//! | [`delete_document`](Transport::delete_document) | `DELETE /documents/{id}` |
//! | [`splitter_config`](Transport::splitter_config) | `GET /splitters/config` |
//! | [`stats`](Transport::stats) | `GET /stats` |
//! | [`health`](Transport::health) | `GET /health` (server root, outside the API prefix) |

pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::models::{
    Chunk, Document, DocumentDetail, DocumentPage, ListQuery, ServiceHealth, ServiceStats,
    SplitterCatalog,
};
use crate::params::SplitterSettings;
use crate::upload::SelectedFile;

pub use http::HttpTransport;
pub use memory::InMemoryTransport;

/// Client side of the document service API.
///
/// Implementations must be `Send + Sync` so one instance can be shared by
/// every store of a session behind an `Arc`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch one page of documents in server order (newest first).
    async fn list_documents(&self, query: &ListQuery) -> Result<DocumentPage, RemoteError>;

    /// Fetch a document with all of its chunks.
    async fn get_document(&self, id: &str) -> Result<DocumentDetail, RemoteError>;

    /// Fetch a single chunk of a document.
    async fn get_chunk(&self, document_id: &str, chunk_id: &str) -> Result<Chunk, RemoteError>;

    /// Upload a file with validated splitter settings.
    ///
    /// The returned [`Document`] is the server's record; nothing in it is
    /// filled in client-side.
    async fn upload_document(
        &self,
        file: &SelectedFile,
        settings: &SplitterSettings,
    ) -> Result<Document, RemoteError>;

    /// Delete a document and its chunks.
    async fn delete_document(&self, id: &str) -> Result<(), RemoteError>;

    /// Fetch splitter types, length functions and per-extension recommendations.
    async fn splitter_config(&self) -> Result<SplitterCatalog, RemoteError>;

    /// Fetch service-wide document and chunk counts.
    async fn stats(&self) -> Result<ServiceStats, RemoteError>;

    /// Liveness check.
    async fn health(&self) -> Result<ServiceHealth, RemoteError>;
}
