//! Media picker seam and its option/outcome types.
//!
//! Types serialize in camelCase so a host bridge can pass them through as
//! JSON unchanged.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use blobdrop_transfer::MediaKind;
use serde::{Deserialize, Serialize};

use crate::MediaError;

/// Which media the picker offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaTypes {
    #[default]
    Images,
    Videos,
    All,
}

/// Options forwarded to the host picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerOptions {
    pub media_types: MediaTypes,
    pub allows_editing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect: Option<(u32, u32)>,
    /// Compression quality in `0.0..=1.0`.
    pub quality: f32,
    #[serde(default)]
    pub allows_multiple_selection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_limit: Option<u32>,
}

impl PickerOptions {
    /// Single image from the library, cropped to 16:9.
    pub fn single_image() -> Self {
        Self {
            media_types: MediaTypes::Images,
            allows_editing: true,
            aspect: Some((16, 9)),
            quality: 0.8,
            allows_multiple_selection: false,
            selection_limit: None,
        }
    }

    /// Up to five images from the library, unedited.
    pub fn multiple_images() -> Self {
        Self {
            media_types: MediaTypes::Images,
            allows_editing: false,
            aspect: None,
            quality: 0.8,
            allows_multiple_selection: true,
            selection_limit: Some(5),
        }
    }

    /// Camera capture, cropped to 16:9.
    pub fn camera() -> Self {
        Self::single_image()
    }

    pub fn with_media_types(mut self, media_types: MediaTypes) -> Self {
        self.media_types = media_types;
        self
    }

    pub fn with_editing(mut self, allows_editing: bool) -> Self {
        self.allows_editing = allows_editing;
        self
    }

    pub fn with_aspect(mut self, width: u32, height: u32) -> Self {
        self.aspect = Some((width, height));
        self
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality.clamp(0.0, 1.0);
        self
    }

    pub fn with_selection_limit(mut self, limit: u32) -> Self {
        self.allows_multiple_selection = true;
        self.selection_limit = Some(limit);
        self
    }
}

/// One selected or captured item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickedAsset {
    /// Local location of the item (`file://` URI or path).
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl PickedAsset {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Media kind, defaulting to image.
    pub fn media_kind(&self) -> MediaKind {
        self.kind.unwrap_or_default()
    }

    /// Extension of the reported file name, if any.
    pub fn extension(&self) -> Option<&str> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
    }
}

/// What the picker returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerOutcome {
    pub canceled: bool,
    #[serde(default)]
    pub assets: Vec<PickedAsset>,
}

impl PickerOutcome {
    pub fn canceled() -> Self {
        Self {
            canceled: true,
            assets: Vec::new(),
        }
    }

    pub fn picked(assets: Vec<PickedAsset>) -> Self {
        Self {
            canceled: false,
            assets,
        }
    }

    /// Selected assets, or `None` if the user canceled or picked nothing.
    pub fn selection(&self) -> Option<&[PickedAsset]> {
        if self.canceled || self.assets.is_empty() {
            None
        } else {
            Some(&self.assets)
        }
    }
}

/// Host media picker.
pub trait MediaPicker: Send + Sync {
    fn launch_library<'a>(
        &'a self,
        options: &'a PickerOptions,
    ) -> Pin<Box<dyn Future<Output = Result<PickerOutcome, MediaError>> + Send + 'a>>;

    fn launch_camera<'a>(
        &'a self,
        options: &'a PickerOptions,
    ) -> Pin<Box<dyn Future<Output = Result<PickerOutcome, MediaError>> + Send + 'a>>;
}
