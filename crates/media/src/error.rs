//! Adapter error types.

use blobdrop_transfer::UploadError;

use crate::Capability;

/// Errors produced by [`MediaUploader`](crate::MediaUploader).
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("permission to access {0} was denied")]
    PermissionDenied(Capability),

    /// For host [`MediaPicker`](crate::MediaPicker) implementations to
    /// report a failed launch; this crate never builds it.
    #[error("picker error: {0}")]
    Picker(String),

    #[error(transparent)]
    Upload(#[from] UploadError),
}
