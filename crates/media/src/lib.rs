//! Media acquisition adapter for the blob upload engine.
//!
//! The host application supplies a [`MediaPicker`] and a [`PermissionGate`];
//! [`MediaUploader`] asks for the right permission, launches the picker with
//! sensible presets, and hands the selected assets to
//! [`BlobUploader`](blobdrop_transfer::BlobUploader).
//!
//! A canceled or empty pick is not an error: the composition helpers return
//! `None`.

pub mod error;
pub mod permissions;
pub mod picker;
pub mod uploader;

pub use error::MediaError;
pub use permissions::{Capability, PermissionGate, PermissionSnapshot, Platform};
pub use picker::{MediaPicker, MediaTypes, PickedAsset, PickerOptions, PickerOutcome};
pub use uploader::MediaUploader;

pub use blobdrop_transfer as transfer;
