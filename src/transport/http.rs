//! `reqwest` implementation of [`Transport`].
//!
//! Error handling follows the server's convention: a non-2xx response
//! carries a JSON body with a `detail` field. A string `detail` is used
//! verbatim; a list of validation entries is flattened to their `msg`
//! texts; anything else falls back to a per-operation generic message.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use super::Transport;
use crate::config::ApiConfig;
use crate::error::RemoteError;
use crate::models::{
    Chunk, Document, DocumentDetail, DocumentPage, ListQuery, ServiceHealth, ServiceStats,
    SplitterCatalog,
};
use crate::params::SplitterSettings;
use crate::upload::SelectedFile;

/// Transport talking to a live document service.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a transport for `base_url` (e.g. `http://localhost:8000/api/v1`).
    ///
    /// No request timeout is set: a hung request keeps its store in
    /// `Loading` until the connection gives up.
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RemoteError::transport(format!("invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::transport(format!(
                "base URL '{}' cannot carry a path",
                base_url
            )));
        }
        let client = Client::builder()
            .user_agent(concat!("chunkscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, RemoteError> {
        Self::new(&config.base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The server root's `/health`, whatever API prefix `base_url` carries.
    fn health_endpoint(&self) -> Url {
        let mut url = self.base_url.clone();
        url.set_path("/health");
        url.set_query(None);
        url
    }

    /// `base_url` with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<Response, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::transport(format!("{}: {}", fallback, e)))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| fallback.to_string());
        tracing::warn!(status = status.as_u16(), %message, "document service returned an error");
        Err(RemoteError::http(status.as_u16(), message))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<T, RemoteError> {
        let response = self.send(request, fallback).await?;
        decode(response, fallback).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T, RemoteError> {
    let status = response.status().as_u16();
    response.json::<T>().await.map_err(|e| {
        RemoteError::new(
            Some(status),
            format!("{}: unexpected response body: {}", fallback, e),
        )
    })
}

/// Extract a human-readable message from an error body, if there is one.
pub fn error_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    match json.get("detail")? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn list_documents(&self, query: &ListQuery) -> Result<DocumentPage, RemoteError> {
        let request = self
            .client
            .get(self.endpoint(&["documents"]))
            .query(&query.to_pairs());
        self.get_json(request, "Error fetching documents").await
    }

    async fn get_document(&self, id: &str) -> Result<DocumentDetail, RemoteError> {
        let request = self.client.get(self.endpoint(&["documents", id]));
        self.get_json(request, "Error fetching document detail").await
    }

    async fn get_chunk(&self, document_id: &str, chunk_id: &str) -> Result<Chunk, RemoteError> {
        let request = self
            .client
            .get(self.endpoint(&["documents", document_id, "chunks", chunk_id]));
        self.get_json(request, "Error fetching document chunk").await
    }

    async fn upload_document(
        &self,
        file: &SelectedFile,
        settings: &SplitterSettings,
    ) -> Result<Document, RemoteError> {
        const FALLBACK: &str = "Error uploading document";

        let config_blob = serde_json::to_string(settings)
            .map_err(|e| RemoteError::transport(format!("{}: {}", FALLBACK, e)))?;
        let mut part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        if let Some(ref content_type) = file.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| RemoteError::transport(format!("{}: {}", FALLBACK, e)))?;
        }
        let form = Form::new()
            .part("file", part)
            .text("splitter_config", config_blob);

        let request = self
            .client
            .post(self.endpoint(&["documents", "upload"]))
            .multipart(form);
        let document: Document = self.get_json(request, FALLBACK).await?;
        if document.file_path.is_none() {
            tracing::warn!(document_id = %document.id, "upload response is missing file_path");
        }
        Ok(document)
    }

    async fn delete_document(&self, id: &str) -> Result<(), RemoteError> {
        let request = self.client.delete(self.endpoint(&["documents", id]));
        self.send(request, "Error deleting document").await?;
        Ok(())
    }

    async fn splitter_config(&self) -> Result<SplitterCatalog, RemoteError> {
        let request = self.client.get(self.endpoint(&["splitters", "config"]));
        self.get_json(request, "Error fetching splitter config").await
    }

    async fn stats(&self) -> Result<ServiceStats, RemoteError> {
        let request = self.client.get(self.endpoint(&["stats"]));
        self.get_json(request, "Error fetching stats").await
    }

    async fn health(&self) -> Result<ServiceHealth, RemoteError> {
        let request = self.client.get(self.health_endpoint());
        self.get_json(request, "Error checking service health").await
    }
}
