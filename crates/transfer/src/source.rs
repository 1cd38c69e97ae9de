//! File access seam.
//!
//! The engine never touches the file system directly; it goes through a
//! [`FileSource`] so hosts can resolve their own location schemes (content
//! URIs, sandboxed containers) and tests can fake sizes.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;

use bytes::Bytes;
use percent_encoding::percent_decode_str;
use tokio::io::AsyncRead;

/// Async reader over a file's content.
pub type FileReader = Pin<Box<dyn AsyncRead + Send + Sync>>;

/// Metadata needed for pre-flight validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub exists: bool,
    /// `None` when the platform cannot report a size.
    pub size: Option<u64>,
}

impl FileStat {
    pub fn missing() -> Self {
        Self {
            exists: false,
            size: None,
        }
    }

    pub fn with_size(size: u64) -> Self {
        Self {
            exists: true,
            size: Some(size),
        }
    }
}

/// Resolves locations to metadata and content.
pub trait FileSource: Send + Sync {
    /// Returns metadata for `location`. A missing file is `Ok` with
    /// `exists == false`, not an error.
    fn stat<'a>(
        &'a self,
        location: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<FileStat>> + Send + 'a>>;

    /// Reads the entire file into memory.
    fn read<'a>(
        &'a self,
        location: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<Bytes>> + Send + 'a>>;

    /// Opens the file for streaming.
    fn open<'a>(
        &'a self,
        location: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<FileReader>> + Send + 'a>>;
}

/// Local file system source. Accepts plain paths and `file://` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSource;

impl LocalFileSource {
    /// Converts a location into a path, decoding `file://` URIs.
    pub fn resolve(location: &str) -> PathBuf {
        match location.strip_prefix("file://") {
            Some(rest) => {
                let decoded = percent_decode_str(rest).decode_utf8_lossy();
                PathBuf::from(decoded.into_owned())
            }
            None => PathBuf::from(location),
        }
    }
}

impl FileSource for LocalFileSource {
    fn stat<'a>(
        &'a self,
        location: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<FileStat>> + Send + 'a>> {
        Box::pin(async move {
            match tokio::fs::metadata(Self::resolve(location)).await {
                Ok(meta) if meta.is_file() => Ok(FileStat::with_size(meta.len())),
                Ok(_) => Ok(FileStat::missing()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FileStat::missing()),
                Err(e) => Err(e),
            }
        })
    }

    fn read<'a>(
        &'a self,
        location: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<Bytes>> + Send + 'a>> {
        Box::pin(async move {
            let data = tokio::fs::read(Self::resolve(location)).await?;
            Ok(Bytes::from(data))
        })
    }

    fn open<'a>(
        &'a self,
        location: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<FileReader>> + Send + 'a>> {
        Box::pin(async move {
            let file = tokio::fs::File::open(Self::resolve(location)).await?;
            Ok(Box::pin(file) as FileReader)
        })
    }
}
