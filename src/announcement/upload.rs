use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::models::{encode_link, StagedAttachment};

/// A file chosen in the picker, not yet uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
        }
    }

    /// Lowercased extension including the dot, e.g. ".pdf"
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
            .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
    }
}

/// A file the upload service has stored and resolved to a URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub url: String,
}

impl TryFrom<UploadedFile> for StagedAttachment {
    type Error = UploadError;

    /// Refuses a blank URL and percent-encodes whitespace in the rest
    fn try_from(file: UploadedFile) -> Result<Self, Self::Error> {
        if file.url.trim().is_empty() {
            return Err(UploadError::failed(file.file_name, "no URL was returned"));
        }
        Ok(StagedAttachment {
            url: encode_link(&file.url),
            file_name: file.file_name,
        })
    }
}

/// Picker validation and transfer failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("{name} is larger than the {max_bytes} byte limit")]
    FileTooLarge {
        name: String,
        size_bytes: u64,
        max_bytes: u64,
    },

    #[error("{name} has an unsupported file type ({mime_type})")]
    UnsupportedType { name: String, mime_type: String },

    #[error("At most {max} files can be uploaded at once ({count} selected)")]
    TooManyFiles { count: usize, max: usize },

    #[error("Upload of {name} failed: {reason}")]
    Failed { name: String, reason: String },
}

impl UploadError {
    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        UploadError::Failed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// External file upload service
#[async_trait]
pub trait UploadGateway: Send + Sync {
    async fn upload(&self, file: &LocalFile) -> Result<UploadedFile, UploadError>;
}

/// Hands out CDN-style URLs without transferring anything
pub struct InMemoryUploadGateway {
    base_url: String,
}

impl Default for InMemoryUploadGateway {
    fn default() -> Self {
        Self::new("https://cdn.classhub.local")
    }
}

impl InMemoryUploadGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl UploadGateway for InMemoryUploadGateway {
    #[instrument(skip(self, file), fields(name = %file.name, size = file.size_bytes))]
    async fn upload(&self, file: &LocalFile) -> Result<UploadedFile, UploadError> {
        if file.size_bytes == 0 {
            debug!("Refusing empty file");
            return Err(UploadError::failed(&file.name, "file is empty"));
        }

        let uploaded = UploadedFile {
            file_name: file.name.clone(),
            url: format!("{}/{}", self.base_url, Uuid::new_v4().simple()),
        };

        info!(url = %uploaded.url, "File uploaded");
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("notes.PDF", Some(".pdf"))]
    #[case("archive.tar.gz", Some(".gz"))]
    #[case("README", None)]
    #[case(".bashrc", None)]
    #[case("trailing.", None)]
    fn test_extension(#[case] name: &str, #[case] expected: Option<&str>) {
        let file = LocalFile::new(name, "application/octet-stream", 1);
        assert_eq!(file.extension().as_deref(), expected);
    }

    #[tokio::test]
    async fn test_in_memory_upload_resolves_unique_urls() {
        let gateway = InMemoryUploadGateway::new("https://cdn.test/");

        let a = gateway
            .upload(&LocalFile::new("a.png", "image/png", 10))
            .await
            .unwrap();
        let b = gateway
            .upload(&LocalFile::new("a.png", "image/png", 10))
            .await
            .unwrap();

        assert!(a.url.starts_with("https://cdn.test/"));
        assert_ne!(a.url, b.url);
        assert!(!a.url.contains(' '));
    }

    #[tokio::test]
    async fn test_in_memory_upload_rejects_empty_file() {
        let gateway = InMemoryUploadGateway::default();

        let result = gateway
            .upload(&LocalFile::new("empty.txt", "text/plain", 0))
            .await;

        assert!(matches!(result, Err(UploadError::Failed { .. })));
    }

    #[rstest]
    #[case("https://cdn.test/my notes.pdf", Ok("https://cdn.test/my%20notes.pdf"))]
    #[case("https://cdn.test/plain.pdf", Ok("https://cdn.test/plain.pdf"))]
    #[case("  ", Err(()))]
    #[case("", Err(()))]
    fn test_uploaded_file_stages_encoded_url(
        #[case] url: &str,
        #[case] expected: Result<&str, ()>,
    ) {
        let staged = StagedAttachment::try_from(UploadedFile {
            file_name: "notes.pdf".to_string(),
            url: url.to_string(),
        });

        match expected {
            Ok(expected) => assert_eq!(staged.unwrap().url, expected),
            Err(()) => assert!(matches!(staged, Err(UploadError::Failed { .. }))),
        }
    }
}
