use serde::{Deserialize, Serialize};

use crate::TransportResponse;

/// Kind of media being uploaded. Selects the remote name prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    /// Prefix used in generated remote names (`img` / `vid`).
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Image => "img",
            Self::Video => "vid",
        }
    }
}

/// Bytes handed to the transport so far for one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub bytes_written: u64,
    pub bytes_expected: u64,
}

impl UploadProgress {
    /// Completed fraction in `0.0..=1.0`; 0 when nothing is expected.
    pub fn fraction(&self) -> f64 {
        if self.bytes_expected == 0 {
            return 0.0;
        }
        (self.bytes_written as f64 / self.bytes_expected as f64).min(1.0)
    }
}

/// A stored blob.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedBlob {
    /// Generated name inside the container.
    pub remote_name: String,
    /// Blob URL without the SAS token.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Raw response from the storage service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<TransportResponse>,
}

/// Outcome of one upload attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadResult {
    Uploaded(UploadedBlob),
    Failed { error: String },
}

impl UploadResult {
    pub(crate) fn failed(error: impl std::fmt::Display) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Uploaded(_))
    }

    /// Failure message, if the upload failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Uploaded(_) => None,
        }
    }

    /// The stored blob, if the upload succeeded.
    pub fn blob(&self) -> Option<&UploadedBlob> {
        match self {
            Self::Uploaded(blob) => Some(blob),
            Self::Failed { .. } => None,
        }
    }
}

/// One entry of a batch upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFileDescriptor {
    /// Local path or `file://` URI.
    pub location: String,
    /// Original file name; only its extension is kept.
    pub name: String,
    #[serde(default)]
    pub kind: MediaKind,
}

impl BatchFileDescriptor {
    pub fn new(location: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            name: name.into(),
            kind: MediaKind::Image,
        }
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }
}
