//! Core data models exchanged with the document service.
//!
//! Field names follow the server's JSON (snake_case); a few are renamed on
//! the Rust side where the wire name is ambiguous (`file_size` →
//! [`Document::file_size_bytes`], `chunk_index` → [`Chunk::ordinal`]).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Server-side processing state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(ProcessingStatus::Pending),
            "processing" => Ok(ProcessingStatus::Processing),
            "completed" => Ok(ProcessingStatus::Completed),
            "failed" => Ok(ProcessingStatus::Failed),
            other => Err(format!(
                "unknown status '{}': expected pending, processing, completed or failed",
                other
            )),
        }
    }
}

/// A document as confirmed by the server.
///
/// Never constructed client-side from guesses: `id`, `file_size_bytes` and
/// `processing_status` always come from a server response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(rename = "file_size")]
    pub file_size_bytes: u64,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u64>,
    pub processing_status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splitter_config: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<NaiveDateTime>,
}

impl Document {
    /// The name the user uploaded, falling back to the stored name.
    pub fn display_name(&self) -> &str {
        self.original_filename.as_deref().unwrap_or(&self.filename)
    }

    /// File size for display, e.g. `"120 KB"`.
    pub fn display_size(&self) -> String {
        format_kb(self.file_size_bytes)
    }
}

/// Render a byte count in whole kilobytes (1 KB = 1024 bytes, rounded half up).
pub fn format_kb(bytes: u64) -> String {
    let kb = (bytes as f64 / 1024.0).round() as u64;
    format!("{} KB", kb)
}

/// One contiguous slice of a document produced by server-side splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    #[serde(rename = "chunk_index")]
    pub ordinal: u32,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_pos: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_pos: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

impl Chunk {
    /// UTF-8 byte length of the chunk text.
    pub fn size_bytes(&self) -> u64 {
        self.content.len() as u64
    }

    /// One-based label, e.g. `"Chunk 1"`.
    pub fn label(&self) -> String {
        format!("Chunk {}", self.ordinal + 1)
    }
}

/// A named parameter row shown on the detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

/// `GET /documents/{id}`: the document plus its chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: Document,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

impl DocumentDetail {
    pub fn id(&self) -> &str {
        &self.document.id
    }

    pub fn chunk(&self, chunk_id: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.id == chunk_id)
    }

    /// Parameter rows for display.
    ///
    /// Uses the server's `parameters` list when present, otherwise the
    /// entries of the document's `splitter_config` object.
    pub fn parameter_rows(&self) -> Vec<Parameter> {
        if !self.parameters.is_empty() {
            return self.parameters.clone();
        }
        match &self.document.splitter_config {
            Some(serde_json::Value::Object(map)) => map
                .iter()
                .map(|(name, value)| Parameter {
                    name: name.clone(),
                    value: match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// `GET /documents`: one page of documents, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl DocumentPage {
    pub fn info(&self) -> PageInfo {
        PageInfo {
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

/// Pagination metadata of the last applied page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

/// Query parameters for `GET /documents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub status: Option<ProcessingStatus>,
    pub content_type: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
            status: None,
            content_type: None,
        }
    }
}

impl ListQuery {
    /// Key/value pairs in the order they are sent.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if let Some(status) = self.status {
            pairs.push(("status", status.to_string()));
        }
        if let Some(ref ct) = self.content_type {
            pairs.push(("content_type", ct.clone()));
        }
        pairs
    }
}

/// A recommendation's separators: the server sends a list, older configs a
/// single string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Separators {
    One(String),
    Many(Vec<String>),
}

impl Separators {
    /// First separator wins, since the form holds a single separator.
    pub fn first(&self) -> Option<&str> {
        match self {
            Separators::One(s) => Some(s.as_str()),
            Separators::Many(list) => list.first().map(String::as_str),
        }
    }
}

/// Server-suggested splitter defaults for one file extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub splitter_type: String,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub length_function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separators: Option<Separators>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterTypeInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default_separators: Option<Vec<String>>,
    #[serde(default)]
    pub recommended_for: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthFunctionInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// `GET /splitters/config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitterCatalog {
    #[serde(default)]
    pub splitter_types: Vec<SplitterTypeInfo>,
    #[serde(default)]
    pub length_functions: Vec<LengthFunctionInfo>,
    /// Keyed by lower-cased file extension without the dot.
    #[serde(default)]
    pub recommendations: HashMap<String, Recommendation>,
}

impl SplitterCatalog {
    /// Recommendations as the upload form should see them: an entry without
    /// separators inherits the first non-empty default separator of its
    /// splitter type.
    pub fn effective_recommendations(&self) -> HashMap<String, Recommendation> {
        self.recommendations
            .iter()
            .map(|(ext, rec)| {
                let mut rec = rec.clone();
                if rec.separators.as_ref().and_then(Separators::first).is_none() {
                    let inherited = self
                        .splitter_types
                        .iter()
                        .find(|t| t.kind == rec.splitter_type)
                        .and_then(|t| t.default_separators.as_ref())
                        .and_then(|seps| seps.iter().find(|s| !s.is_empty()))
                        .cloned();
                    if let Some(sep) = inherited {
                        rec.separators = Some(Separators::One(sep));
                    }
                }
                (ext.clone(), rec)
            })
            .collect()
    }
}

/// `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
}

impl ServiceHealth {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// `GET /stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub total_documents: u64,
    pub total_chunks: u64,
    #[serde(default)]
    pub status_distribution: HashMap<String, u64>,
    #[serde(default)]
    pub file_type_distribution: HashMap<String, u64>,
}

/// Load status of one store. Each store owns its own; they are never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Error(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

/// What happened to a resolved store request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response was current and is now reflected in the store.
    Applied,
    /// A newer request (or a clear) superseded this one; the response was dropped.
    Stale,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn server_document() -> serde_json::Value {
        json!({
            "id": "doc-1",
            "filename": "5c1d.pdf",
            "original_filename": "report.pdf",
            "file_path": "uploads/5c1d.pdf",
            "file_size": 122880,
            "content_type": "application/pdf",
            "file_extension": ".pdf",
            "content_length": 5400,
            "total_chunks": 2,
            "processing_status": "completed",
            "error_message": null,
            "created_at": "2024-05-01T10:00:00",
            "updated_at": null,
            "processed_at": "2024-05-01T10:00:02"
        })
    }

    #[test]
    fn test_document_decodes_server_shape() {
        let doc: Document = serde_json::from_value(server_document()).unwrap();
        assert_eq!(doc.id, "doc-1");
        assert_eq!(doc.file_size_bytes, 122880);
        assert_eq!(doc.processing_status, ProcessingStatus::Completed);
        assert_eq!(doc.display_name(), "report.pdf");
        assert_eq!(doc.display_size(), "120 KB");
        assert!(doc.splitter_config.is_none());
        assert_eq!(doc.created_at.to_string(), "2024-05-01 10:00:00");
        assert_eq!(
            doc.processed_at.map(|t| t - doc.created_at),
            Some(chrono::Duration::seconds(2))
        );
        assert!(doc.updated_at.is_none());
    }

    #[test]
    fn test_format_kb_rounds_to_nearest() {
        assert_eq!(format_kb(0), "0 KB");
        assert_eq!(format_kb(511), "0 KB");
        assert_eq!(format_kb(512), "1 KB");
        assert_eq!(format_kb(1536), "2 KB");
        assert_eq!(format_kb(10 * 1024 + 100), "10 KB");
    }

    #[test]
    fn test_detail_decodes_chunks_and_parameters() {
        let mut value = server_document();
        value["chunks"] = json!([
            {"id": "c1", "chunk_index": 0, "content": "alpha", "document_id": "doc-1"},
            {"id": "c2", "chunk_index": 1, "content": "beta gamma"}
        ]);
        value["splitter_config"] = json!({"chunk_size": 1000, "splitter_type": "recursive"});

        let detail: DocumentDetail = serde_json::from_value(value).unwrap();
        assert_eq!(detail.id(), "doc-1");
        assert_eq!(detail.chunks.len(), 2);
        assert_eq!(detail.chunks[1].ordinal, 1);
        assert_eq!(detail.chunks[1].size_bytes(), 10);
        assert_eq!(detail.chunks[1].label(), "Chunk 2");
        assert!(detail.chunk("c2").is_some());

        let rows = detail.parameter_rows();
        assert!(rows
            .iter()
            .any(|p| p.name == "splitter_type" && p.value == "recursive"));
        assert!(rows.iter().any(|p| p.name == "chunk_size" && p.value == "1000"));
    }

    #[test]
    fn test_explicit_parameters_take_precedence() {
        let mut value = server_document();
        value["parameters"] = json!([{"name": "Chunk Size", "value": "800"}]);
        value["splitter_config"] = json!({"chunk_size": 1000});
        let detail: DocumentDetail = serde_json::from_value(value).unwrap();
        assert_eq!(
            detail.parameter_rows(),
            vec![Parameter {
                name: "Chunk Size".into(),
                value: "800".into()
            }]
        );
    }

    #[test]
    fn test_separators_accept_list_or_string() {
        let list: Recommendation = serde_json::from_value(json!({
            "splitter_type": "character",
            "chunk_size": 2000,
            "chunk_overlap": 100,
            "length_function": "len",
            "separators": ["\n", " "]
        }))
        .unwrap();
        assert_eq!(list.separators.unwrap().first(), Some("\n"));

        let single: Recommendation = serde_json::from_value(json!({
            "splitter_type": "character",
            "chunk_size": 2000,
            "chunk_overlap": 100,
            "length_function": "len",
            "separators": "\n\n"
        }))
        .unwrap();
        assert_eq!(single.separators.unwrap().first(), Some("\n\n"));

        let empty = Separators::Many(vec![]);
        assert_eq!(empty.first(), None);
    }

    #[test]
    fn test_list_query_pairs() {
        let query = ListQuery {
            page: 2,
            per_page: 50,
            status: Some(ProcessingStatus::Failed),
            content_type: Some("text/plain".into()),
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("page", "2".to_string()),
                ("per_page", "50".to_string()),
                ("status", "failed".to_string()),
                ("content_type", "text/plain".to_string()),
            ]
        );
        assert_eq!(ListQuery::default().to_pairs().len(), 2);
    }

    #[test]
    fn test_status_parses_case_insensitively() {
        assert_eq!(
            "Completed".parse::<ProcessingStatus>(),
            Ok(ProcessingStatus::Completed)
        );
        assert!("done".parse::<ProcessingStatus>().is_err());
    }

    #[test]
    fn test_missing_separators_inherit_splitter_defaults() {
        let catalog: SplitterCatalog = serde_json::from_value(json!({
            "splitter_types": [
                { "type": "recursive", "name": "Recursive", "default_separators": ["", "\n\n", "\n"] },
                { "type": "token", "name": "Token", "default_separators": null }
            ],
            "recommendations": {
                "pdf": { "splitter_type": "recursive", "chunk_size": 1000, "chunk_overlap": 200, "length_function": "len" },
                "csv": { "splitter_type": "recursive", "chunk_size": 2000, "chunk_overlap": 100, "length_function": "len", "separators": "\n" },
                "md": { "splitter_type": "token", "chunk_size": 500, "chunk_overlap": 50, "length_function": "len" }
            }
        }))
        .unwrap();

        let recs = catalog.effective_recommendations();
        assert_eq!(recs["pdf"].separators, Some(Separators::One("\n\n".into())));
        assert_eq!(recs["csv"].separators, Some(Separators::One("\n".into())));
        assert_eq!(recs["md"].separators, None);
        // the catalog itself is left as the server sent it
        assert_eq!(catalog.recommendations["pdf"].separators, None);
    }
}
