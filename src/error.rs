//! Error taxonomy for the document lifecycle controller.
//!
//! | Type | Raised by | Reaches the network? |
//! |------|-----------|----------------------|
//! | [`RemoteError`] | every [`Transport`](crate::transport::Transport) call | yes |
//! | [`ValidationError`] | [`SplitterParameters::validate`](crate::params::SplitterParameters::validate) | no |
//! | [`UploadError`] | [`UploadOrchestrator`](crate::upload::UploadOrchestrator) | only the `Remote` variant |
//! | [`SelectionError`] | [`DocumentDetailStore::select_chunk`](crate::detail_store::DocumentDetailStore::select_chunk) | no |
//!
//! Stale responses are not errors: the stores report them as
//! [`LoadOutcome::Stale`](crate::models::LoadOutcome::Stale) and drop them.

use std::fmt;

use thiserror::Error;

/// A non-2xx response or a transport failure.
///
/// `status` is `None` when no HTTP status was received (connection refused,
/// DNS failure, undecodable body on a 2xx). `message` is the server's
/// `detail` text when one could be parsed, otherwise a generic fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Failure with an HTTP status code.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(Some(status), message)
    }

    /// Failure below HTTP (no status received).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// One of the five splitter parameter fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterField {
    SplitterType,
    SeparatorType,
    ChunkSize,
    ChunkOverlap,
    LengthFunction,
}

impl ParameterField {
    pub const ALL: [ParameterField; 5] = [
        ParameterField::SplitterType,
        ParameterField::SeparatorType,
        ParameterField::ChunkSize,
        ParameterField::ChunkOverlap,
        ParameterField::LengthFunction,
    ];

    /// Wire name, as used in the upload `splitter_config` blob.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterField::SplitterType => "splitter_type",
            ParameterField::SeparatorType => "separator_type",
            ParameterField::ChunkSize => "chunk_size",
            ParameterField::ChunkOverlap => "chunk_overlap",
            ParameterField::LengthFunction => "length_function",
        }
    }
}

impl fmt::Display for ParameterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side parameter validation failure, scoped to a single field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: ParameterField,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: ParameterField, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Staged failure of an upload submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("no file selected")]
    NoFileSelected,

    #[error("invalid parameter {0}")]
    InvalidParameters(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("an upload is already in progress")]
    Busy,
}

impl UploadError {
    /// The offending field for parameter failures, so a form can highlight it.
    pub fn invalid_field(&self) -> Option<ParameterField> {
        match self {
            UploadError::InvalidParameters(e) => Some(e.field),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("chunk {chunk_id} is not part of the loaded document")]
    InvalidSelection { chunk_id: String },
}
