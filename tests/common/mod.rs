#![allow(dead_code)]

//! Shared helpers for integration tests.
//!
//! - [`GatedTransport`] wraps an [`InMemoryTransport`] and holds the
//!   responses of chosen operations until the test releases them, in any
//!   order. The inner call runs when the request arrives, so each held
//!   response is a snapshot of the service at issue time.
//! - [`spawn_stub`] starts an axum stand-in for the document service on
//!   `127.0.0.1:0`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use chunkscope::error::RemoteError;
use chunkscope::models::{
    Chunk, Document, DocumentDetail, DocumentPage, ListQuery, ProcessingStatus, Recommendation,
    Separators, ServiceHealth, ServiceStats, SplitterCatalog,
};
use chunkscope::params::SplitterSettings;
use chunkscope::transport::memory::{default_catalog, InMemoryTransport, Operation};
use chunkscope::transport::Transport;
use chunkscope::upload::SelectedFile;

// ─── Fixtures ───────────────────────────────────────────────────────

pub fn document(id: &str, name: &str) -> Document {
    Document {
        id: id.to_string(),
        filename: format!("{}-{}", id, name),
        original_filename: Some(name.to_string()),
        file_size_bytes: 4096,
        content_type: "text/plain".to_string(),
        file_path: Some(format!("uploads/{}-{}", id, name)),
        file_extension: None,
        content_length: None,
        total_chunks: None,
        processing_status: ProcessingStatus::Completed,
        error_message: None,
        splitter_config: None,
        created_at: "2024-05-01T10:00:00".parse().unwrap(),
        updated_at: None,
        processed_at: None,
    }
}

pub fn detail(id: &str, name: &str, chunks: &[&str]) -> DocumentDetail {
    DocumentDetail {
        document: document(id, name),
        chunks: chunks
            .iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                id: format!("{}-c{}", id, i),
                ordinal: i as u32,
                content: text.to_string(),
                content_length: None,
                document_id: Some(id.to_string()),
                start_pos: None,
                end_pos: None,
                chunk_metadata: None,
                created_at: None,
            })
            .collect(),
        parameters: Vec::new(),
    }
}

/// In-memory service listing `ids` in the given order.
pub fn seeded(ids: &[&str]) -> Arc<InMemoryTransport> {
    let transport = Arc::new(InMemoryTransport::new());
    for id in ids.iter().rev() {
        transport.insert(detail(id, &format!("{}.txt", id), &["first", "second"]));
    }
    transport
}

/// The catalog entry from the upload walkthrough: `.pdf` files get a
/// recursive splitter with two separators.
pub fn report_pdf_catalog() -> SplitterCatalog {
    let mut catalog = default_catalog();
    catalog.recommendations.insert(
        "pdf".to_string(),
        Recommendation {
            splitter_type: "recursive".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            length_function: "char".to_string(),
            separators: Some(Separators::Many(vec!["\n\n".into(), "\n".into()])),
        },
    );
    catalog
}

pub fn ids(docs: &[Document]) -> Vec<&str> {
    docs.iter().map(|d| d.id.as_str()).collect()
}

// ─── Gated transport ────────────────────────────────────────────────

#[derive(Default)]
struct Gates {
    /// Per operation, one slot per arrival, in arrival order.
    held: HashMap<Operation, Vec<Option<oneshot::Sender<()>>>>,
}

pub struct GatedTransport {
    inner: Arc<InMemoryTransport>,
    gated: HashSet<Operation>,
    gates: Mutex<Gates>,
}

impl GatedTransport {
    pub fn new(inner: Arc<InMemoryTransport>, gated: &[Operation]) -> Self {
        Self {
            inner,
            gated: gated.iter().copied().collect(),
            gates: Mutex::new(Gates::default()),
        }
    }

    pub fn inner(&self) -> &Arc<InMemoryTransport> {
        &self.inner
    }

    /// Number of gated calls of `operation` that have arrived so far.
    pub fn arrivals(&self, operation: Operation) -> usize {
        self.gates
            .lock()
            .unwrap()
            .held
            .get(&operation)
            .map_or(0, Vec::len)
    }

    /// Yield to other tasks until `count` calls of `operation` have arrived.
    pub async fn wait_for(&self, operation: Operation, count: usize) {
        for _ in 0..10_000 {
            if self.arrivals(operation) >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "only {} of {} {:?} calls arrived",
            self.arrivals(operation),
            count,
            operation
        );
    }

    /// Let the `index`-th (0-based) call of `operation` return.
    pub fn release(&self, operation: Operation, index: usize) {
        let sender = self
            .gates
            .lock()
            .unwrap()
            .held
            .get_mut(&operation)
            .and_then(|slots| slots.get_mut(index))
            .and_then(Option::take)
            .unwrap_or_else(|| panic!("no held {:?} call #{}", operation, index));
        let _ = sender.send(());
    }

    async fn hold<T>(&self, operation: Operation, result: T) -> T {
        if !self.gated.contains(&operation) {
            return result;
        }
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .held
            .entry(operation)
            .or_default()
            .push(Some(tx));
        let _ = rx.await;
        result
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn list_documents(&self, query: &ListQuery) -> Result<DocumentPage, RemoteError> {
        let result = self.inner.list_documents(query).await;
        self.hold(Operation::List, result).await
    }

    async fn get_document(&self, id: &str) -> Result<DocumentDetail, RemoteError> {
        let result = self.inner.get_document(id).await;
        self.hold(Operation::Get, result).await
    }

    async fn get_chunk(&self, document_id: &str, chunk_id: &str) -> Result<Chunk, RemoteError> {
        let result = self.inner.get_chunk(document_id, chunk_id).await;
        self.hold(Operation::GetChunk, result).await
    }

    async fn upload_document(
        &self,
        file: &SelectedFile,
        settings: &SplitterSettings,
    ) -> Result<Document, RemoteError> {
        let result = self.inner.upload_document(file, settings).await;
        self.hold(Operation::Upload, result).await
    }

    async fn delete_document(&self, id: &str) -> Result<(), RemoteError> {
        let result = self.inner.delete_document(id).await;
        self.hold(Operation::Delete, result).await
    }

    async fn splitter_config(&self) -> Result<SplitterCatalog, RemoteError> {
        let result = self.inner.splitter_config().await;
        self.hold(Operation::SplitterConfig, result).await
    }

    async fn stats(&self) -> Result<ServiceStats, RemoteError> {
        let result = self.inner.stats().await;
        self.hold(Operation::Stats, result).await
    }

    async fn health(&self) -> Result<ServiceHealth, RemoteError> {
        let result = self.inner.health().await;
        self.hold(Operation::Health, result).await
    }
}

// ─── Stub HTTP service ──────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct RecordedUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub splitter_config: Value,
}

/// What the stub has seen.
#[derive(Default)]
pub struct StubState {
    pub queries: Mutex<Vec<HashMap<String, String>>>,
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub deleted: Mutex<Vec<String>>,
}

pub fn stub_document(id: &str, name: &str, size: u64) -> Value {
    json!({
        "id": id,
        "filename": format!("{}.bin", id),
        "original_filename": name,
        "file_path": format!("uploads/{}.bin", id),
        "file_size": size,
        "content_type": "application/pdf",
        "file_extension": ".pdf",
        "content_length": 42,
        "total_chunks": 2,
        "processing_status": "completed",
        "error_message": null,
        "created_at": "2024-05-01T10:00:00",
        "updated_at": null,
        "processed_at": "2024-05-01T10:00:02"
    })
}

fn stub_chunk(document_id: &str, index: u32, content: &str) -> Value {
    json!({
        "id": format!("{}-c{}", document_id, index),
        "document_id": document_id,
        "chunk_index": index,
        "content": content,
        "content_length": content.len(),
        "start_pos": index * 100,
        "end_pos": index * 100 + content.len() as u32,
        "chunk_metadata": {},
        "created_at": "2024-05-01T10:00:02"
    })
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": format!("{} not found", what) })),
    )
        .into_response()
}

async fn list_documents(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.queries.lock().unwrap().push(params.clone());
    let per_page: u32 = params
        .get("per_page")
        .and_then(|v| v.parse().ok())
        .unwrap_or(20);
    if per_page > 100 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [{
                "loc": ["query", "per_page"],
                "msg": "ensure this value is less than or equal to 100",
                "type": "value_error.number.not_le"
            }]})),
        )
            .into_response();
    }
    Json(json!({
        "documents": [
            stub_document("doc-2", "minutes.pdf", 2048),
            stub_document("doc-1", "report.pdf", 122880)
        ],
        "total": 2,
        "page": 1,
        "per_page": per_page,
        "total_pages": 1
    }))
    .into_response()
}

async fn get_document(Path(id): Path<String>) -> Response {
    if id != "doc-1" {
        return not_found("Document");
    }
    let mut body = stub_document("doc-1", "report.pdf", 122880);
    body["splitter_config"] = json!({"chunk_size": 1000, "splitter_type": "recursive"});
    body["chunks"] = json!([
        stub_chunk("doc-1", 0, "Quarterly revenue grew."),
        stub_chunk("doc-1", 1, "Costs were flat.")
    ]);
    Json(body).into_response()
}

async fn get_chunk(Path((id, chunk_id)): Path<(String, String)>) -> Response {
    if id == "doc-1" && chunk_id == "doc-1-c1" {
        Json(stub_chunk("doc-1", 1, "Costs were flat.")).into_response()
    } else {
        not_found("Chunk")
    }
}

async fn delete_document(State(state): State<Arc<StubState>>, Path(id): Path<String>) -> Response {
    match id.as_str() {
        "doc-1" | "doc-2" => {
            state.deleted.lock().unwrap().push(id.clone());
            Json(json!({ "message": "Document deleted successfully" })).into_response()
        }
        "locked" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
        _ => not_found("Document"),
    }
}

async fn upload_document(State(state): State<Arc<StubState>>, mut multipart: Multipart) -> Response {
    let mut recorded = RecordedUpload::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                recorded.file_name = field.file_name().map(str::to_string);
                recorded.content_type = field.content_type().map(str::to_string);
                recorded.bytes = field.bytes().await.unwrap().to_vec();
            }
            Some("splitter_config") => {
                let text = field.text().await.unwrap();
                recorded.splitter_config = serde_json::from_str(&text).unwrap();
            }
            _ => {}
        }
    }

    let file_name = recorded.file_name.clone().unwrap_or_default();
    let size = recorded.bytes.len() as u64;
    state.uploads.lock().unwrap().push(recorded);

    if file_name.ends_with(".exe") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "File type not supported" })),
        )
            .into_response();
    }
    Json(stub_document("doc-new", &file_name, size)).into_response()
}

async fn splitter_config() -> Json<Value> {
    Json(json!({
        "splitter_types": [
            {
                "type": "recursive",
                "name": "Recursive Character Text Splitter",
                "description": "Splits text recursively",
                "default_separators": ["\n\n", "\n", " ", ""],
                "recommended_for": ["General text"]
            },
            {
                "type": "token",
                "name": "Token Text Splitter",
                "description": "Splits by token count",
                "default_separators": null,
                "recommended_for": ["LLM processing"]
            }
        ],
        "length_functions": [
            { "type": "len", "name": "Character Length", "description": "Count characters in text" }
        ],
        "recommendations": {
            "pdf": {
                "splitter_type": "recursive",
                "chunk_size": 1000,
                "chunk_overlap": 200,
                "length_function": "len",
                "separators": ["\n\n", "\n"]
            },
            "txt": {
                "splitter_type": "recursive",
                "chunk_size": 1200,
                "chunk_overlap": 200,
                "length_function": "len"
            },
            "csv": {
                "splitter_type": "character",
                "chunk_size": 2000,
                "chunk_overlap": 100,
                "length_function": "len",
                "separators": "\n"
            }
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn stats() -> Json<Value> {
    Json(json!({
        "total_documents": 2,
        "total_chunks": 4,
        "status_distribution": { "completed": 1, "failed": 1 },
        "file_type_distribution": { "application/pdf": 2 }
    }))
}

/// Start the stub service; returns its API base URL and recorded state.
pub async fn spawn_stub() -> (String, Arc<StubState>) {
    let state = Arc::new(StubState::default());
    let app = Router::new()
        .route("/api/v1/documents", get(list_documents))
        .route("/api/v1/documents/upload", post(upload_document))
        .route(
            "/api/v1/documents/{id}",
            get(get_document).delete(delete_document),
        )
        .route("/api/v1/documents/{id}/chunks/{chunk_id}", get(get_chunk))
        .route("/api/v1/splitters/config", get(splitter_config))
        .route("/api/v1/stats", get(stats))
        .route("/health", get(health))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api/v1", addr), state)
}
