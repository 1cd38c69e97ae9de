//! Host permission gate.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// Platform the host application runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    /// Browser-hosted; capabilities are granted implicitly.
    Web,
}

impl Platform {
    /// Whether permission prompts exist on this platform.
    pub fn requires_permissions(self) -> bool {
        !matches!(self, Self::Web)
    }
}

/// A capability guarded by a runtime permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Camera,
    MediaLibrary,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Camera => "camera",
            Self::MediaLibrary => "media library",
        })
    }
}

/// Pass-through to the host's permission system.
pub trait PermissionGate: Send + Sync {
    /// Current state without prompting.
    fn status(&self, capability: Capability) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;

    /// Prompts if needed; resolves to whether the capability is granted.
    fn request(&self, capability: Capability)
    -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Result of [`MediaUploader::check_permissions`](crate::MediaUploader::check_permissions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSnapshot {
    pub camera: bool,
    pub media_library: bool,
}
