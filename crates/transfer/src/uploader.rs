//! The upload engine.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::progress::counting_stream;
use crate::{
    BatchFileDescriptor, BatchObserver, BlobTransport, ConfigSummary, FileSource, HttpTransport,
    LocalFileSource, MediaKind, PutBody, PutRequest, TransportError, UploadError, UploadProgress,
    UploadResult, UploadedBlob, UploaderConfig, check_file_stat, derive_remote_name,
    resolve_content_type,
};

const BLOB_TYPE_HEADER: &str = "x-ms-blob-type";
const BLOB_CONTENT_TYPE_HEADER: &str = "x-ms-blob-content-type";
const BLOCK_BLOB: &str = "BlockBlob";

/// Uploads local files into one blob container.
///
/// Upload operations never return `Err`: validation, I/O and HTTP failures
/// come back as [`UploadResult::Failed`].
pub struct BlobUploader {
    account: String,
    container: String,
    sas_token: String,
    base_url: String,
    transport: Arc<dyn BlobTransport>,
    files: Arc<dyn FileSource>,
}

impl std::fmt::Debug for BlobUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobUploader")
            .field("account", &self.account)
            .field("container", &self.container)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl BlobUploader {
    /// Creates an uploader using the local file system and `reqwest`.
    pub fn new(config: UploaderConfig) -> Result<Self, UploadError> {
        config.validate()?;
        let transport = HttpTransport::new()?;
        Self::with_collaborators(config, Arc::new(transport), Arc::new(LocalFileSource))
    }

    /// Creates an uploader with explicit transport and file source.
    pub fn with_collaborators(
        config: UploaderConfig,
        transport: Arc<dyn BlobTransport>,
        files: Arc<dyn FileSource>,
    ) -> Result<Self, UploadError> {
        config.validate()?;
        let base_url = config.base_url();

        Ok(Self {
            account: config.account,
            container: config.container,
            sas_token: config.sas_token,
            base_url,
            transport,
            files,
        })
    }

    /// Replaces the SAS token for subsequent uploads.
    pub fn update_access_token(&mut self, token: impl Into<String>) -> Result<(), UploadError> {
        let token = token.into();
        if token.is_empty() {
            return Err(UploadError::InvalidToken);
        }
        self.sas_token = token;
        debug!(account = %self.account, "SAS token updated");
        Ok(())
    }

    /// Blob URL for `remote_name`, without the token.
    pub fn blob_url(&self, remote_name: &str) -> String {
        format!("{}/{remote_name}", self.base_url)
    }

    /// Configuration without the token.
    pub fn describe_config(&self) -> ConfigSummary {
        ConfigSummary {
            account: self.account.clone(),
            container: self.container.clone(),
            base_url: self.base_url.clone(),
        }
    }

    /// Pre-flight check shared by every upload path. Returns the file size.
    pub async fn validate(&self, location: &str) -> Result<u64, UploadError> {
        let stat = self.files.stat(location).await?;
        check_file_stat(location, &stat)
    }

    /// Uploads the whole file in one buffered PUT.
    pub async fn upload_file(
        &self,
        location: &str,
        original_name: &str,
        kind: MediaKind,
    ) -> UploadResult {
        match self.try_upload_file(location, original_name, kind).await {
            Ok(blob) => {
                info!(remote_name = %blob.remote_name, size = ?blob.size, "upload complete");
                UploadResult::Uploaded(blob)
            }
            Err(e) => {
                warn!(location, error = %e, "upload failed");
                UploadResult::failed(e)
            }
        }
    }

    /// Streams the file, reporting progress to `on_progress`.
    ///
    /// Every progress notification is delivered before this returns. Only
    /// HTTP 200 and 201 count as success.
    pub async fn upload_with_progress<F>(
        &self,
        location: &str,
        original_name: &str,
        kind: MediaKind,
        mut on_progress: F,
    ) -> UploadResult
    where
        F: FnMut(UploadProgress),
    {
        match self
            .try_upload_streaming(location, original_name, kind, &mut on_progress)
            .await
        {
            Ok(blob) => {
                info!(remote_name = %blob.remote_name, size = ?blob.size, "upload complete");
                UploadResult::Uploaded(blob)
            }
            Err(e) => {
                warn!(location, error = %e, "upload with progress failed");
                UploadResult::failed(e)
            }
        }
    }

    /// Uploads `files` one at a time, in order.
    ///
    /// A failed file never stops the batch. The returned results are
    /// index-aligned with `files`.
    pub async fn upload_batch<O>(
        &self,
        files: &[BatchFileDescriptor],
        observer: &mut O,
    ) -> Vec<UploadResult>
    where
        O: BatchObserver + ?Sized,
    {
        let mut results = Vec::with_capacity(files.len());

        for (index, file) in files.iter().enumerate() {
            let result = self
                .upload_with_progress(&file.location, &file.name, file.kind, |progress| {
                    observer.on_progress(index, progress)
                })
                .await;

            observer.on_file_complete(index, &result);
            results.push(result);
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        debug!(total = files.len(), failed, "batch finished");

        results
    }

    async fn try_upload_file(
        &self,
        location: &str,
        original_name: &str,
        kind: MediaKind,
    ) -> Result<UploadedBlob, UploadError> {
        self.validate(location).await?;

        let remote_name = derive_remote_name(original_name, kind);
        let content_type = resolve_content_type(&remote_name);
        let data = self.files.read(location).await?;
        let size = data.len() as u64;

        let request = PutRequest {
            url: self.upload_url(&remote_name),
            headers: vec![
                (BLOB_TYPE_HEADER.into(), BLOCK_BLOB.into()),
                ("Content-Type".into(), content_type.into()),
                ("Content-Length".into(), size.to_string()),
                (BLOB_CONTENT_TYPE_HEADER.into(), content_type.into()),
            ],
            body: PutBody::Bytes(data),
        };

        debug!(remote_name = %remote_name, size, content_type, "uploading blob");
        let response = self.transport.put(request).await?;

        if !response.is_success() {
            return Err(TransportError::Rejected {
                status: response.status,
                body: response.body,
            }
            .into());
        }

        Ok(UploadedBlob {
            url: self.blob_url(&remote_name),
            remote_name,
            size: Some(size),
            content_type: Some(content_type.to_string()),
            response: Some(response),
        })
    }

    async fn try_upload_streaming(
        &self,
        location: &str,
        original_name: &str,
        kind: MediaKind,
        on_progress: &mut dyn FnMut(UploadProgress),
    ) -> Result<UploadedBlob, UploadError> {
        let size = self.validate(location).await?;

        let remote_name = derive_remote_name(original_name, kind);
        let content_type = resolve_content_type(&remote_name);
        let reader = self.files.open(location).await?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = PutRequest {
            url: self.upload_url(&remote_name),
            headers: vec![
                (BLOB_TYPE_HEADER.into(), BLOCK_BLOB.into()),
                ("Content-Type".into(), content_type.into()),
            ],
            body: PutBody::Stream {
                stream: counting_stream(reader, size, tx),
                length: size,
            },
        };

        debug!(remote_name = %remote_name, size, content_type, "streaming blob");

        // Progress is produced inside the transport; replay it on this task
        // so the callback never has to be Send.
        let transfer = self.transport.put(request);
        tokio::pin!(transfer);
        let outcome = loop {
            tokio::select! {
                biased;
                Some(progress) = rx.recv() => notify(on_progress, progress),
                outcome = &mut transfer => break outcome,
            }
        };
        while let Ok(progress) = rx.try_recv() {
            notify(on_progress, progress);
        }

        let response = outcome?;
        if !matches!(response.status, 200 | 201) {
            return Err(TransportError::UnexpectedStatus(response.status).into());
        }

        Ok(UploadedBlob {
            url: self.blob_url(&remote_name),
            remote_name,
            size: Some(size),
            content_type: Some(content_type.to_string()),
            response: Some(response),
        })
    }

    fn upload_url(&self, remote_name: &str) -> String {
        let token = self.sas_token.trim_start_matches('?');
        format!("{}?{token}", self.blob_url(remote_name))
    }
}

/// Invokes a progress callback; a panicking callback must not abort the
/// transfer it is observing.
fn notify(on_progress: &mut dyn FnMut(UploadProgress), progress: UploadProgress) {
    if catch_unwind(AssertUnwindSafe(|| on_progress(progress))).is_err() {
        warn!(
            bytes_written = progress.bytes_written,
            "progress callback panicked"
        );
    }
}
