//! Progress reporting: per-chunk byte counting and batch notifications.

use futures_util::StreamExt;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;

use crate::{ByteStream, FileReader, UploadProgress, UploadResult};

/// Receives notifications from [`BlobUploader::upload_batch`](crate::BlobUploader::upload_batch).
///
/// For each file, every `on_progress` call precedes its `on_file_complete`
/// call, and files are reported strictly in input order.
pub trait BatchObserver {
    fn on_progress(&mut self, _index: usize, _progress: UploadProgress) {}

    fn on_file_complete(&mut self, _index: usize, _result: &UploadResult) {}
}

/// No-op observer.
impl BatchObserver for () {}

/// Batch notification sent over a channel.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Progress {
        index: usize,
        progress: UploadProgress,
    },
    FileComplete {
        index: usize,
        result: UploadResult,
    },
}

/// Forwards notifications as [`BatchEvent`]s. A closed receiver is ignored.
impl BatchObserver for mpsc::UnboundedSender<BatchEvent> {
    fn on_progress(&mut self, index: usize, progress: UploadProgress) {
        let _ = self.send(BatchEvent::Progress { index, progress });
    }

    fn on_file_complete(&mut self, index: usize, result: &UploadResult) {
        let _ = self.send(BatchEvent::FileComplete {
            index,
            result: result.clone(),
        });
    }
}

/// Turns a file reader into a body stream of exactly `length` bytes that
/// reports cumulative progress on `tx` as each chunk is handed out.
pub(crate) fn counting_stream(
    reader: FileReader,
    length: u64,
    tx: mpsc::UnboundedSender<UploadProgress>,
) -> ByteStream {
    let mut written: u64 = 0;
    let stream = ReaderStream::new(reader.take(length)).inspect(move |chunk| {
        if let Ok(chunk) = chunk {
            written += chunk.len() as u64;
            let _ = tx.send(UploadProgress {
                bytes_written: written,
                bytes_expected: length,
            });
        }
    });
    Box::pin(stream)
}
