//! Upload Orchestrator: file selection, parameter form and submission.
//!
//! A submission walks `Idle → ValidatingFile → ValidatingParameters →
//! Uploading → Succeeded | Failed → Idle`. Each stage fails with its own
//! [`UploadError`] variant. Only one submission may be in flight; a second
//! `submit` while one is running is rejected with [`UploadError::Busy`].
//!
//! On success the server's [`Document`] is prepended to the list store and,
//! if the form still holds the submitted file, the form is reset so the same
//! file/parameter pairing cannot be sent twice by accident.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::error::UploadError;
use crate::list_store::DocumentListStore;
use crate::lock;
use crate::models::{format_kb, Document, Recommendation};
use crate::params::{self, ParameterForm, SplitterParameters, SplitterSettings};
use crate::transport::Transport;

/// A file chosen for upload, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Not a file path: {}", path.display()))?;
        let content_type = mime_guess::from_path(path).first_or_octet_stream();
        Ok(Self::new(name, bytes).with_content_type(content_type.to_string()))
    }

    /// Lower-cased extension of the file name, without the dot.
    pub fn extension(&self) -> Option<String> {
        params::file_extension(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    ValidatingFile,
    ValidatingParameters,
    Uploading,
    Succeeded,
    Failed,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UploadPhase::Idle => "idle",
            UploadPhase::ValidatingFile => "validating_file",
            UploadPhase::ValidatingParameters => "validating_parameters",
            UploadPhase::Uploading => "uploading",
            UploadPhase::Succeeded => "succeeded",
            UploadPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedDocument {
    pub document: Document,
    /// Server-reported size in whole KB, e.g. `"120 KB"`.
    pub display_size: String,
}

/// Snapshot of the upload form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSnapshot {
    pub file: Option<SelectedFile>,
    pub form: ParameterForm,
}

#[derive(Debug, Default)]
struct FormState {
    file: Option<SelectedFile>,
    params: ParameterForm,
    recommendations: HashMap<String, Recommendation>,
}

/// Holds the busy slot for one submission; releasing it returns the
/// orchestrator to `Idle`, including when the submit future is dropped.
struct PhaseGuard<'a> {
    phase: &'a Mutex<UploadPhase>,
}

impl PhaseGuard<'_> {
    fn set(&self, phase: UploadPhase) {
        tracing::debug!(%phase, "upload phase");
        *lock(self.phase) = phase;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        *lock(self.phase) = UploadPhase::Idle;
    }
}

pub struct UploadOrchestrator {
    transport: Arc<dyn Transport>,
    list: Arc<DocumentListStore>,
    phase: Mutex<UploadPhase>,
    form: Mutex<FormState>,
}

impl UploadOrchestrator {
    pub fn new(transport: Arc<dyn Transport>, list: Arc<DocumentListStore>) -> Self {
        Self {
            transport,
            list,
            phase: Mutex::new(UploadPhase::Idle),
            form: Mutex::new(FormState::default()),
        }
    }

    pub fn phase(&self) -> UploadPhase {
        *lock(&self.phase)
    }

    /// Replace the per-extension recommendations.
    ///
    /// The recommendation for the selected file is displayed, but the field
    /// values are left alone until [`apply_recommendation`](Self::apply_recommendation).
    pub fn set_recommendations(&self, recommendations: HashMap<String, Recommendation>) {
        let mut form = lock(&self.form);
        let offered = form
            .file
            .as_ref()
            .and_then(|f| params::recommendation_for(&f.name, &recommendations))
            .cloned();
        form.params.offer(offered);
        form.recommendations = recommendations;
    }

    /// Choose the file to upload. Returns whether the form was seeded from
    /// the file's recommendation (only a pristine form is).
    pub fn select_file(&self, file: SelectedFile) -> bool {
        let mut form = lock(&self.form);
        let recommendation =
            params::recommendation_for(&file.name, &form.recommendations).cloned();
        form.file = Some(file);
        form.params.seed(recommendation)
    }

    /// Edit the parameter form in place.
    pub fn edit_parameters<R>(&self, edit: impl FnOnce(&mut ParameterForm) -> R) -> R {
        edit(&mut lock(&self.form).params)
    }

    /// Overwrite every field with the displayed recommendation.
    pub fn apply_recommendation(&self) -> bool {
        lock(&self.form).params.apply_recommendation()
    }

    /// Drop the selected file and reset the form to pristine.
    pub fn reset_form(&self) {
        let mut form = lock(&self.form);
        form.file = None;
        form.params.reset();
    }

    /// A file picked while the upload was in flight survives its success.
    fn reset_form_if_holding(&self, submitted: &SelectedFile) {
        let mut form = lock(&self.form);
        if form.file.as_ref() == Some(submitted) {
            form.file = None;
            form.params.reset();
        }
    }

    pub fn selected_file(&self) -> Option<SelectedFile> {
        lock(&self.form).file.clone()
    }

    pub fn form(&self) -> FormSnapshot {
        let form = lock(&self.form);
        FormSnapshot {
            file: form.file.clone(),
            form: form.params.clone(),
        }
    }

    /// Submit the selected file with the form's current values.
    pub fn submit(
        &self,
    ) -> impl Future<Output = Result<UploadedDocument, UploadError>> + Send + '_ {
        let (file, values) = {
            let form = lock(&self.form);
            (form.file.clone(), form.params.values().clone())
        };
        self.submit_with(file.as_ref(), &values)
    }

    /// Submit `file` with explicit parameters.
    ///
    /// The busy check and both validation stages run when this is called;
    /// only the upload itself waits for the returned future to be polled.
    pub fn submit_with(
        &self,
        file: Option<&SelectedFile>,
        parameters: &SplitterParameters,
    ) -> impl Future<Output = Result<UploadedDocument, UploadError>> + Send + '_ {
        let prepared = self.prepare(file, parameters);
        async move {
            let (guard, file, settings) = prepared?;
            match self.transport.upload_document(&file, &settings).await {
                Ok(document) => {
                    let display_size = format_kb(document.file_size_bytes);
                    self.list.insert_optimistic(document.clone());
                    self.reset_form_if_holding(&file);
                    guard.set(UploadPhase::Succeeded);
                    tracing::info!(
                        document_id = %document.id,
                        filename = %file.name,
                        size = %display_size,
                        "document uploaded"
                    );
                    Ok(UploadedDocument {
                        document,
                        display_size,
                    })
                }
                Err(err) => {
                    guard.set(UploadPhase::Failed);
                    Err(UploadError::Remote(err))
                }
            }
        }
    }

    fn prepare(
        &self,
        file: Option<&SelectedFile>,
        parameters: &SplitterParameters,
    ) -> Result<(PhaseGuard<'_>, SelectedFile, SplitterSettings), UploadError> {
        let guard = {
            let mut phase = lock(&self.phase);
            if *phase != UploadPhase::Idle {
                return Err(UploadError::Busy);
            }
            *phase = UploadPhase::ValidatingFile;
            PhaseGuard { phase: &self.phase }
        };
        tracing::debug!(phase = %UploadPhase::ValidatingFile, "upload phase");

        let Some(file) = file.cloned() else {
            guard.set(UploadPhase::Failed);
            return Err(UploadError::NoFileSelected);
        };

        guard.set(UploadPhase::ValidatingParameters);
        let settings = match parameters.validate() {
            Ok(settings) => settings,
            Err(err) => {
                guard.set(UploadPhase::Failed);
                return Err(err.into());
            }
        };

        guard.set(UploadPhase::Uploading);
        Ok((guard, file, settings))
    }
}
