//! In-memory [`Transport`] implementation for testing and offline use.
//!
//! Models the document service in-process: server-assigned UUIDs,
//! newest-first listing with filters and pagination, per-document chunks,
//! deletes, the default splitter catalog and stats. Chunking is a naive
//! fixed character window honouring `chunk_size` / `chunk_overlap`; it stands
//! in for the real splitter and makes no claim to match it.
//!
//! Failures can be injected per [`Operation`] with
//! [`fail_next`](InMemoryTransport::fail_next); each injected error is
//! consumed by exactly one call.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::Transport;
use crate::error::RemoteError;
use crate::lock;
use crate::models::{
    Chunk, Document, DocumentDetail, DocumentPage, LengthFunctionInfo, ListQuery,
    ProcessingStatus, Recommendation, Separators, ServiceHealth, ServiceStats, SplitterCatalog,
    SplitterTypeInfo,
};
use crate::params::SplitterSettings;
use crate::upload::SelectedFile;

/// One kind of server interaction, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    GetChunk,
    Upload,
    Delete,
    SplitterConfig,
    Stats,
    Health,
}

/// In-process stand-in for the document service.
pub struct InMemoryTransport {
    /// Newest first, like the server's `ORDER BY created_at DESC`.
    docs: Mutex<Vec<DocumentDetail>>,
    catalog: Mutex<SplitterCatalog>,
    failures: Mutex<Vec<(Operation, RemoteError)>>,
    calls: Mutex<HashMap<Operation, usize>>,
}

impl InMemoryTransport {
    /// Empty service with [`default_catalog`].
    pub fn new() -> Self {
        Self::with_catalog(default_catalog())
    }

    pub fn with_catalog(catalog: SplitterCatalog) -> Self {
        Self {
            docs: Mutex::new(Vec::new()),
            catalog: Mutex::new(catalog),
            failures: Mutex::new(Vec::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Store a document as if the server had created it; it lists first.
    pub fn insert(&self, detail: DocumentDetail) {
        let mut docs = lock(&self.docs);
        docs.retain(|d| d.document.id != detail.document.id);
        docs.insert(0, detail);
    }

    /// Make the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: RemoteError) {
        lock(&self.failures).push((operation, error));
    }

    /// Number of calls of `operation` so far (including failed ones).
    pub fn calls(&self, operation: Operation) -> usize {
        lock(&self.calls).get(&operation).copied().unwrap_or(0)
    }

    pub fn document_ids(&self) -> Vec<String> {
        lock(&self.docs)
            .iter()
            .map(|d| d.document.id.clone())
            .collect()
    }

    /// Count the call and pop an injected failure for it, if any.
    fn enter(&self, operation: Operation) -> Result<(), RemoteError> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        let mut failures = lock(&self.failures);
        match failures.iter().position(|(op, _)| *op == operation) {
            Some(pos) => Err(failures.remove(pos).1),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(what: &str) -> RemoteError {
    RemoteError::http(404, format!("{} not found", what))
}

/// Cut `text` into windows of `chunk_size` characters, each starting
/// `chunk_size - chunk_overlap` characters after the previous one.
fn window_chunks(text: &str, chunk_size: u32, chunk_overlap: u32) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let size = chunk_size.max(1) as usize;
    let overlap = (chunk_overlap as usize).min(size - 1);

    let mut pieces = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        pieces.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }
    pieces
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn list_documents(&self, query: &ListQuery) -> Result<DocumentPage, RemoteError> {
        self.enter(Operation::List)?;
        if query.page < 1 {
            return Err(RemoteError::http(
                422,
                "ensure this value is greater than or equal to 1",
            ));
        }
        if !(1..=100).contains(&query.per_page) {
            return Err(RemoteError::http(
                422,
                "per_page must be between 1 and 100",
            ));
        }

        let docs = lock(&self.docs);
        let matching: Vec<&Document> = docs
            .iter()
            .map(|d| &d.document)
            .filter(|d| query.status.map_or(true, |s| d.processing_status == s))
            .filter(|d| {
                query
                    .content_type
                    .as_deref()
                    .map_or(true, |ct| d.content_type == ct)
            })
            .collect();

        let total = matching.len() as u64;
        let per_page = query.per_page as usize;
        let documents = matching
            .into_iter()
            .skip((query.page as usize - 1) * per_page)
            .take(per_page)
            .cloned()
            .collect();

        Ok(DocumentPage {
            documents,
            total,
            page: query.page,
            per_page: query.per_page,
            total_pages: total.div_ceil(query.per_page as u64) as u32,
        })
    }

    async fn get_document(&self, id: &str) -> Result<DocumentDetail, RemoteError> {
        self.enter(Operation::Get)?;
        lock(&self.docs)
            .iter()
            .find(|d| d.document.id == id)
            .cloned()
            .ok_or_else(|| not_found("Document"))
    }

    async fn get_chunk(&self, document_id: &str, chunk_id: &str) -> Result<Chunk, RemoteError> {
        self.enter(Operation::GetChunk)?;
        lock(&self.docs)
            .iter()
            .find(|d| d.document.id == document_id)
            .and_then(|d| d.chunk(chunk_id))
            .cloned()
            .ok_or_else(|| not_found("Chunk"))
    }

    async fn upload_document(
        &self,
        file: &SelectedFile,
        settings: &SplitterSettings,
    ) -> Result<Document, RemoteError> {
        self.enter(Operation::Upload)?;

        let id = Uuid::new_v4().to_string();
        let extension = file.extension().map(|ext| format!(".{}", ext));
        let stored_name = format!("{}{}", Uuid::new_v4(), extension.as_deref().unwrap_or(""));
        let text = String::from_utf8_lossy(&file.bytes);
        let now = chrono::Utc::now().naive_utc();

        let chunks: Vec<Chunk> = window_chunks(&text, settings.chunk_size, settings.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk {
                id: Uuid::new_v4().to_string(),
                ordinal: i as u32,
                content_length: Some(content.chars().count() as u64),
                content,
                document_id: Some(id.clone()),
                start_pos: None,
                end_pos: None,
                chunk_metadata: None,
                created_at: Some(now),
            })
            .collect();

        let document = Document {
            id: id.clone(),
            filename: stored_name.clone(),
            original_filename: Some(file.name.clone()),
            file_size_bytes: file.bytes.len() as u64,
            content_type: file
                .content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            file_path: Some(format!("uploads/{}", stored_name)),
            file_extension: extension,
            content_length: Some(text.chars().count() as u64),
            total_chunks: Some(chunks.len() as u64),
            processing_status: ProcessingStatus::Completed,
            error_message: None,
            splitter_config: serde_json::to_value(settings).ok(),
            created_at: now,
            updated_at: None,
            processed_at: Some(now),
        };

        self.insert(DocumentDetail {
            document: document.clone(),
            chunks,
            parameters: Vec::new(),
        });
        Ok(document)
    }

    async fn delete_document(&self, id: &str) -> Result<(), RemoteError> {
        self.enter(Operation::Delete)?;
        let mut docs = lock(&self.docs);
        let before = docs.len();
        docs.retain(|d| d.document.id != id);
        if docs.len() == before {
            return Err(not_found("Document"));
        }
        Ok(())
    }

    async fn splitter_config(&self) -> Result<SplitterCatalog, RemoteError> {
        self.enter(Operation::SplitterConfig)?;
        Ok(lock(&self.catalog).clone())
    }

    async fn stats(&self) -> Result<ServiceStats, RemoteError> {
        self.enter(Operation::Stats)?;
        let docs = lock(&self.docs);
        let mut stats = ServiceStats {
            total_documents: docs.len() as u64,
            total_chunks: docs.iter().map(|d| d.chunks.len() as u64).sum(),
            ..Default::default()
        };
        for d in docs.iter() {
            *stats
                .status_distribution
                .entry(d.document.processing_status.to_string())
                .or_insert(0) += 1;
            *stats
                .file_type_distribution
                .entry(d.document.content_type.clone())
                .or_insert(0) += 1;
        }
        Ok(stats)
    }

    async fn health(&self) -> Result<ServiceHealth, RemoteError> {
        self.enter(Operation::Health)?;
        Ok(ServiceHealth {
            status: "ok".to_string(),
        })
    }
}

/// The catalog the document service ships with.
pub fn default_catalog() -> SplitterCatalog {
    fn rec(splitter: &str, size: u32, overlap: u32, separators: Option<&[&str]>) -> Recommendation {
        Recommendation {
            splitter_type: splitter.to_string(),
            chunk_size: size,
            chunk_overlap: overlap,
            length_function: "len".to_string(),
            separators: separators
                .map(|s| Separators::Many(s.iter().map(|x| x.to_string()).collect())),
        }
    }

    let recommendations = [
        ("pdf", rec("recursive", 1000, 200, None)),
        ("docx", rec("recursive", 800, 150, None)),
        ("txt", rec("recursive", 1200, 200, None)),
        ("csv", rec("character", 2000, 100, Some(&["\n"]))),
        ("html", rec("recursive", 1500, 300, None)),
        ("code", rec("recursive", 800, 100, None)),
    ]
    .into_iter()
    .map(|(ext, r)| (ext.to_string(), r))
    .collect();

    SplitterCatalog {
        splitter_types: vec![
            SplitterTypeInfo {
                kind: "recursive".into(),
                name: "Recursive Character Text Splitter".into(),
                description: "Splits text recursively by different characters, trying to keep semantically relevant content together".into(),
                default_separators: Some(vec!["\n\n".into(), "\n".into(), " ".into(), "".into()]),
                recommended_for: vec!["General text".into(), "Articles".into(), "Books".into(), "Documentation".into()],
            },
            SplitterTypeInfo {
                kind: "character".into(),
                name: "Character Text Splitter".into(),
                description: "Splits text by a single character separator".into(),
                default_separators: Some(vec!["\n".into()]),
                recommended_for: vec!["Structured text".into(), "Lists".into(), "Simple documents".into()],
            },
            SplitterTypeInfo {
                kind: "token".into(),
                name: "Token Text Splitter".into(),
                description: "Splits text based on token count rather than character count".into(),
                default_separators: None,
                recommended_for: vec!["LLM processing".into(), "Token-limited applications".into()],
            },
        ],
        length_functions: vec![
            LengthFunctionInfo {
                kind: "len".into(),
                name: "Character Length".into(),
                description: "Count characters in text".into(),
            },
            LengthFunctionInfo {
                kind: "tiktoken".into(),
                name: "Tiktoken (GPT tokens)".into(),
                description: "Count tokens using tiktoken encoder".into(),
            },
        ],
        recommendations,
    }
}
