//! Splitter parameter resolution and validation.
//!
//! Merges what the user typed with the server's per-extension
//! [`Recommendation`]s:
//!
//! - [`file_extension`]: lower-cased text after the last `.` of a filename.
//! - [`recommendation_for`]: the usable recommendation for a filename, if any.
//! - [`resolve`]: default [`SplitterParameters`] seeded from that recommendation.
//! - [`ParameterForm`]: live form state; a recommendation only overwrites
//!   hand edits through [`ParameterForm::apply_recommendation`].
//! - [`SplitterParameters::validate`]: the gate before upload, reporting the
//!   first invalid field.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ParameterField, ValidationError};
use crate::models::Recommendation;

/// Splitter parameters as edited in the form. Any field may still be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitterParameters {
    pub splitter_type: String,
    pub separator_type: String,
    pub chunk_size: Option<u32>,
    pub chunk_overlap: Option<u32>,
    pub length_function: String,
}

/// Validated parameters, serialized as the upload's `splitter_config` blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterSettings {
    pub splitter_type: String,
    pub separator_type: String,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub length_function: String,
}

impl SplitterParameters {
    /// Seed all five fields from a recommendation.
    ///
    /// `separator_type` takes the first listed separator, or stays empty when
    /// the recommendation lists none.
    pub fn from_recommendation(rec: &Recommendation) -> Self {
        Self {
            splitter_type: rec.splitter_type.clone(),
            separator_type: rec
                .separators
                .as_ref()
                .and_then(|s| s.first())
                .unwrap_or_default()
                .to_string(),
            chunk_size: Some(rec.chunk_size),
            chunk_overlap: Some(rec.chunk_overlap),
            length_function: rec.length_function.clone(),
        }
    }

    /// Check every field in form order and return the first failure.
    ///
    /// `splitter_type` and `length_function` must be non-blank, the separator
    /// non-empty, `chunk_size` must be > 0,
    /// `chunk_overlap` must be present and strictly smaller than `chunk_size`.
    pub fn validate(&self) -> Result<SplitterSettings, ValidationError> {
        let splitter_type = required_text(ParameterField::SplitterType, &self.splitter_type)?;
        // separators are usually whitespace, so only emptiness counts here
        if self.separator_type.is_empty() {
            return Err(ValidationError::new(ParameterField::SeparatorType, "is required"));
        }
        let separator_type = self.separator_type.clone();

        let chunk_size = match self.chunk_size {
            None => return Err(ValidationError::new(ParameterField::ChunkSize, "is required")),
            Some(0) => {
                return Err(ValidationError::new(
                    ParameterField::ChunkSize,
                    "must be greater than 0",
                ))
            }
            Some(n) => n,
        };

        let chunk_overlap = self
            .chunk_overlap
            .ok_or_else(|| ValidationError::new(ParameterField::ChunkOverlap, "is required"))?;
        if chunk_overlap >= chunk_size {
            return Err(ValidationError::new(
                ParameterField::ChunkOverlap,
                format!(
                    "must be smaller than chunk_size ({} >= {})",
                    chunk_overlap, chunk_size
                ),
            ));
        }

        let length_function =
            required_text(ParameterField::LengthFunction, &self.length_function)?;

        Ok(SplitterSettings {
            splitter_type,
            separator_type,
            chunk_size,
            chunk_overlap,
            length_function,
        })
    }
}

fn required_text(field: ParameterField, value: &str) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field, "is required"))
    } else {
        Ok(value.to_string())
    }
}

/// Lower-cased extension of `filename`, without the dot.
///
/// `None` when there is no `.` or nothing follows the last one.
pub fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

/// The recommendation for `filename`'s extension, if one exists and is usable.
///
/// A recommendation with `chunk_size == 0` or `chunk_overlap >= chunk_size`
/// is ignored, so seeding can never produce parameters that break the
/// overlap invariant.
pub fn recommendation_for<'a>(
    filename: &str,
    recommendations: &'a HashMap<String, Recommendation>,
) -> Option<&'a Recommendation> {
    let ext = file_extension(filename)?;
    let rec = recommendations.get(&ext)?;
    if rec.chunk_size == 0 || rec.chunk_overlap >= rec.chunk_size {
        tracing::warn!(
            extension = %ext,
            chunk_size = rec.chunk_size,
            chunk_overlap = rec.chunk_overlap,
            "ignoring recommendation that violates chunk_overlap < chunk_size"
        );
        return None;
    }
    Some(rec)
}

/// Default parameters for `filename`, seeded from its recommendation.
pub fn resolve(
    filename: &str,
    recommendations: &HashMap<String, Recommendation>,
) -> Option<SplitterParameters> {
    recommendation_for(filename, recommendations).map(SplitterParameters::from_recommendation)
}

/// Live state of the parameter form.
///
/// Tracks whether the user has typed into any field since the last reset.
/// A pristine form is seeded when a file with a recommendation is selected;
/// an edited one only shows the recommendation until it is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterForm {
    values: SplitterParameters,
    recommendation: Option<Recommendation>,
    edited: bool,
}

impl ParameterForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &SplitterParameters {
        &self.values
    }

    /// The recommendation currently on display.
    pub fn recommendation(&self) -> Option<&Recommendation> {
        self.recommendation.as_ref()
    }

    pub fn is_edited(&self) -> bool {
        self.edited
    }

    /// Display a recommendation without touching the field values.
    pub fn offer(&mut self, recommendation: Option<Recommendation>) {
        self.recommendation = recommendation;
    }

    /// Display a recommendation for a newly selected file and, if the form is
    /// still pristine, seed the fields from it. Returns whether it seeded.
    pub fn seed(&mut self, recommendation: Option<Recommendation>) -> bool {
        self.offer(recommendation);
        if self.edited {
            return false;
        }
        match self.recommendation {
            Some(ref rec) => {
                self.values = SplitterParameters::from_recommendation(rec);
                true
            }
            None => false,
        }
    }

    /// Overwrite all fields with the displayed recommendation.
    ///
    /// Idempotent. Returns `false` (and changes nothing) when no
    /// recommendation is on display.
    pub fn apply_recommendation(&mut self) -> bool {
        match self.recommendation {
            Some(ref rec) => {
                self.values = SplitterParameters::from_recommendation(rec);
                self.edited = false;
                true
            }
            None => false,
        }
    }

    pub fn set_splitter_type(&mut self, value: impl Into<String>) {
        self.values.splitter_type = value.into();
        self.edited = true;
    }

    pub fn set_separator_type(&mut self, value: impl Into<String>) {
        self.values.separator_type = value.into();
        self.edited = true;
    }

    pub fn set_chunk_size(&mut self, value: Option<u32>) {
        self.values.chunk_size = value;
        self.edited = true;
    }

    pub fn set_chunk_overlap(&mut self, value: Option<u32>) {
        self.values.chunk_overlap = value;
        self.edited = true;
    }

    pub fn set_length_function(&mut self, value: impl Into<String>) {
        self.values.length_function = value.into();
        self.edited = true;
    }

    /// Back to empty fields, no recommendation, pristine.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
