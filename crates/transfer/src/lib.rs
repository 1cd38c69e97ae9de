//! Upload engine for SAS-authorized blob containers.
//!
//! [`BlobUploader`] validates local media, derives a collision-resistant
//! remote name and content type, and PUTs the file into a block-blob
//! container. Per-file failures are reported as [`UploadResult::Failed`]
//! values instead of errors so that batches keep going.
//!
//! File access and HTTP are behind the [`FileSource`] and [`BlobTransport`]
//! traits; the defaults use `tokio::fs` and `reqwest`.

mod config;
mod naming;
mod progress;
mod source;
mod transport;
mod types;
mod uploader;
mod validation;

pub use config::{ConfigSummary, UploaderConfig};
pub use naming::{derive_remote_name, remote_name_at, resolve_content_type};
pub use progress::{BatchEvent, BatchObserver};
pub use source::{FileReader, FileSource, FileStat, LocalFileSource};
pub use transport::{
    BlobTransport, ByteStream, HttpTransport, PutBody, PutRequest, TransportError,
    TransportResponse,
};
pub use types::{BatchFileDescriptor, MediaKind, UploadProgress, UploadResult, UploadedBlob};
pub use uploader::BlobUploader;
pub use validation::check_file_stat;

/// Largest file accepted for upload: 50 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Size in MiB rounded to the nearest whole number, half rounding up.
fn megabytes(size: &u64) -> u64 {
    const MIB: u64 = 1024 * 1024;
    (size + MIB / 2) / MIB
}

/// Required configuration fields, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Account,
    Container,
    SasToken,
}

impl std::fmt::Display for ConfigField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Account => "storage account name",
            Self::Container => "container name",
            Self::SasToken => "SAS token",
        })
    }
}

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{0} is required")]
    MissingConfig(ConfigField),

    #[error("SAS token cannot be empty")]
    InvalidToken,

    #[error("file does not exist: {0}")]
    FileNotFound(String),

    #[error("file is empty: {0}")]
    EmptyFile(String),

    #[error(
        "file size ({}MB, {} bytes) exceeds maximum allowed size (50MB)",
        megabytes(.size),
        .size
    )]
    FileTooLarge { size: u64 },

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file error: {0}")]
    ConfigFile(#[from] serde_json::Error),
}
