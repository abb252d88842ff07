//! CLI renderers.
//!
//! Each `run_*` function builds a [`Session`] from the config, drives one
//! store operation, and prints the result to stdout. Diagnostics go through
//! `tracing` (stderr).

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::models::{format_kb, Document, ListQuery, ProcessingStatus};
use crate::session::Session;
use crate::upload::SelectedFile;

/// Hand-set splitter parameters for `upload`; unset fields keep the
/// recommended values.
#[derive(Debug, Clone, Default)]
pub struct ParameterOverrides {
    pub splitter_type: Option<String>,
    pub separator: Option<String>,
    pub chunk_size: Option<u32>,
    pub chunk_overlap: Option<u32>,
    pub length_function: Option<String>,
}

fn session(config: &Config) -> Result<Session> {
    Session::from_config(config).context("Failed to create API client")
}

fn print_document_row(doc: &Document) {
    println!(
        "{:<38} {:<32} {:>10} {:<11} {}",
        doc.id,
        doc.display_name(),
        doc.display_size(),
        doc.processing_status,
        doc.created_at
    );
}

pub async fn run_list(
    config: &Config,
    page: u32,
    per_page: Option<u32>,
    status: Option<ProcessingStatus>,
    content_type: Option<String>,
) -> Result<()> {
    let session = session(config)?;
    let query = ListQuery {
        page,
        per_page: per_page.unwrap_or(config.listing.per_page),
        status,
        content_type,
    };
    session.list().load_with(query).await?;

    let snapshot = session.list().snapshot();
    if snapshot.documents.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    println!(
        "{:<38} {:<32} {:>10} {:<11} CREATED",
        "ID", "NAME", "SIZE", "STATUS"
    );
    for doc in &snapshot.documents {
        print_document_row(doc);
    }
    if let Some(info) = snapshot.page {
        println!();
        println!(
            "page {}/{} ({} documents, {} on this page)",
            info.page,
            info.total_pages,
            info.total,
            total_size(&snapshot.documents)
        );
    }
    Ok(())
}

pub async fn run_show(config: &Config, id: &str, chunk: Option<&str>) -> Result<()> {
    let session = session(config)?;
    let detail_store = session.detail();
    detail_store.load(id).await?;
    if let Some(chunk_id) = chunk {
        detail_store.select_chunk(chunk_id)?;
    }

    let snapshot = detail_store.snapshot();
    let Some(detail) = snapshot.detail else {
        anyhow::bail!("Document {} did not load", id);
    };
    let doc = &detail.document;

    println!("--- Document ---");
    println!("id:           {}", doc.id);
    println!("name:         {}", doc.display_name());
    println!("size:         {}", doc.display_size());
    println!("content_type: {}", doc.content_type);
    println!("status:       {}", doc.processing_status);
    if let Some(ref err) = doc.error_message {
        println!("error:        {}", err);
    }
    println!("created_at:   {}", doc.created_at);
    if let Some(ref processed) = doc.processed_at {
        println!("processed_at: {}", processed);
    }
    println!();

    let rows = detail.parameter_rows();
    if !rows.is_empty() {
        println!("--- Parameters ---");
        for row in &rows {
            println!("{:<16} {:?}", row.name, row.value);
        }
        println!();
    }

    println!("--- Chunks ({}) ---", detail.chunks.len());
    for chunk in &detail.chunks {
        let marker = if snapshot.selection.as_deref() == Some(chunk.id.as_str()) {
            '*'
        } else {
            ' '
        };
        println!(
            "{} {:<10} {:>8} B  {}",
            marker,
            chunk.label(),
            chunk.size_bytes(),
            chunk.id
        );
    }

    if let Some(selected) = detail_store.selected_chunk() {
        println!();
        println!("--- {} ---", selected.label());
        println!("{}", selected.content);
    }
    Ok(())
}

pub async fn run_chunk(config: &Config, document_id: &str, chunk_id: &str) -> Result<()> {
    let session = session(config)?;
    let chunk = session
        .transport()
        .get_chunk(document_id, chunk_id)
        .await?;

    println!("--- {} ({} B) ---", chunk.label(), chunk.size_bytes());
    if let (Some(start), Some(end)) = (chunk.start_pos, chunk.end_pos) {
        println!("range: {}..{}", start, end);
    }
    println!("{}", chunk.content);
    Ok(())
}

pub async fn run_upload(config: &Config, path: &Path, overrides: ParameterOverrides) -> Result<()> {
    let session = session(config)?;
    if let Err(err) = session.load_splitter_config().await {
        tracing::warn!(error = %err, "continuing without splitter recommendations");
    }

    let file = SelectedFile::from_path(path).await?;
    let upload = session.upload();
    if upload.select_file(file) {
        tracing::debug!("parameters seeded from recommendation");
    }
    upload.edit_parameters(|form| {
        if let Some(v) = overrides.splitter_type {
            form.set_splitter_type(v);
        }
        if let Some(v) = overrides.separator {
            form.set_separator_type(v);
        }
        if let Some(v) = overrides.chunk_size {
            form.set_chunk_size(Some(v));
        }
        if let Some(v) = overrides.chunk_overlap {
            form.set_chunk_overlap(Some(v));
        }
        if let Some(v) = overrides.length_function {
            form.set_length_function(v);
        }
    });

    let uploaded = upload.submit().await?;
    let doc = &uploaded.document;
    println!(
        "Uploaded {} ({}) as {}",
        doc.display_name(),
        uploaded.display_size,
        doc.id
    );
    if let Some(chunks) = doc.total_chunks {
        println!("chunks: {}", chunks);
    }
    println!("status: {}", doc.processing_status);
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let session = session(config)?;
    session.list().remove_optimistic(id).await?;
    println!("Deleted {}", id);
    Ok(())
}

pub async fn run_splitters(config: &Config) -> Result<()> {
    let session = session(config)?;
    let catalog = session.load_splitter_config().await?;

    println!("--- Splitter types ---");
    for splitter in &catalog.splitter_types {
        println!("{:<12} {}", splitter.kind, splitter.name);
        if !splitter.description.is_empty() {
            println!("    {}", splitter.description);
        }
    }
    println!();

    println!("--- Length functions ---");
    for func in &catalog.length_functions {
        println!("{:<12} {}", func.kind, func.name);
    }
    println!();

    println!("--- Recommendations ---");
    println!(
        "{:<8} {:<12} {:>6} {:>8} {:<8} SEPARATOR",
        "EXT", "SPLITTER", "SIZE", "OVERLAP", "LENGTH"
    );
    let mut extensions: Vec<&String> = catalog.recommendations.keys().collect();
    extensions.sort();
    for ext in extensions {
        let rec = &catalog.recommendations[ext];
        println!(
            "{:<8} {:<12} {:>6} {:>8} {:<8} {}",
            ext,
            rec.splitter_type,
            rec.chunk_size,
            rec.chunk_overlap,
            rec.length_function,
            rec.separators
                .as_ref()
                .and_then(|s| s.first())
                .map(|s| format!("{:?}", s))
                .unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let session = session(config)?;
    let stats = session.transport().stats().await?;

    println!("documents: {}", stats.total_documents);
    println!("chunks:    {}", stats.total_chunks);

    let mut statuses: Vec<_> = stats.status_distribution.iter().collect();
    statuses.sort();
    if !statuses.is_empty() {
        println!();
        println!("{:<16} COUNT", "STATUS");
        for (status, count) in statuses {
            println!("{:<16} {}", status, count);
        }
    }

    let mut types: Vec<_> = stats.file_type_distribution.iter().collect();
    types.sort();
    if !types.is_empty() {
        println!();
        println!("{:<32} COUNT", "CONTENT TYPE");
        for (content_type, count) in types {
            println!("{:<32} {}", content_type, count);
        }
    }
    Ok(())
}

pub async fn run_health(config: &Config) -> Result<()> {
    let session = session(config)?;
    let health = session.transport().health().await?;
    if !health.is_ok() {
        anyhow::bail!("service reports status '{}'", health.status);
    }
    println!("service: {}", health.status);
    Ok(())
}

/// Combined size of `docs`, e.g. `"360 KB"`.
fn total_size(docs: &[Document]) -> String {
    format_kb(docs.iter().map(|d| d.file_size_bytes).sum())
}
