use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter};
use tracing::debug;

use super::upload::{LocalFile, UploadError};

pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_MAX_FILES: usize = 5;

/// File categories the picker lets through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AcceptedType {
    Document,
    Image,
    Video,
    Audio,
    Text,
}

impl AcceptedType {
    /// Picker accept pattern for this category
    pub fn pattern(&self) -> &'static str {
        match self {
            AcceptedType::Document => ".pdf",
            AcceptedType::Image => "image/*",
            AcceptedType::Video => "video/*",
            AcceptedType::Audio => "audio/*",
            AcceptedType::Text => "text/*",
        }
    }

    pub fn accepts(&self, file: &LocalFile) -> bool {
        let mime = file.mime_type.to_ascii_lowercase();
        match self {
            AcceptedType::Document => {
                mime == "application/pdf" || file.extension().as_deref() == Some(".pdf")
            }
            AcceptedType::Image => mime.starts_with("image/"),
            AcceptedType::Video => mime.starts_with("video/"),
            AcceptedType::Audio => mime.starts_with("audio/"),
            AcceptedType::Text => mime.starts_with("text/"),
        }
    }
}

/// Upload picker options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerConfig {
    pub accepted_types: Vec<AcceptedType>,
    pub max_file_bytes: u64,
    /// Limit per pick, not per draft
    pub max_files: usize,
    /// Return to the expanded composer once all uploads of a pick have landed
    pub close_on_complete: bool,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            accepted_types: AcceptedType::iter().collect(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files: DEFAULT_MAX_FILES,
            close_on_complete: false,
        }
    }
}

/// Result of validating one pick
#[derive(Debug, Default)]
pub struct PickValidation {
    pub accepted: Vec<LocalFile>,
    pub rejected: Vec<UploadError>,
}

impl PickerConfig {
    pub fn accept_patterns(&self) -> Vec<&'static str> {
        self.accepted_types.iter().map(AcceptedType::pattern).collect()
    }

    /// Checks a single file against the size and type limits
    pub fn check_file(&self, file: &LocalFile) -> Result<(), UploadError> {
        if file.size_bytes > self.max_file_bytes {
            return Err(UploadError::FileTooLarge {
                name: file.name.clone(),
                size_bytes: file.size_bytes,
                max_bytes: self.max_file_bytes,
            });
        }
        if !self.accepted_types.iter().any(|t| t.accepts(file)) {
            return Err(UploadError::UnsupportedType {
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
            });
        }
        Ok(())
    }

    /// Splits a pick into files to upload and per-file rejections
    ///
    /// A pick over the file limit is refused as a whole.
    pub fn validate_pick(&self, files: Vec<LocalFile>) -> Result<PickValidation, UploadError> {
        if files.len() > self.max_files {
            return Err(UploadError::TooManyFiles {
                count: files.len(),
                max: self.max_files,
            });
        }

        let mut validation = PickValidation::default();
        for file in files {
            match self.check_file(&file) {
                Ok(()) => validation.accepted.push(file),
                Err(e) => {
                    debug!(name = %file.name, error = %e, "File rejected by picker");
                    validation.rejected.push(e);
                }
            }
        }
        Ok(validation)
    }
}
