//! Uploads and downloads with a progress contract.
//!
//! Whatever the protocol layer reports, sinks handed to [`MediaTransfer`]
//! observe `0 <= done <= total`, `done` never decreases, and the last call of
//! a successful transfer has `done == total`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

use crate::protocol::{FileHandle, ProgressSink, ProtocolClient, ProtocolError, UploadKind};
use crate::types::{Entity, MediaItem};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("cannot read {}: {source}", path.display())]
    FileNotFound { path: PathBuf, source: io::Error },
    #[error("{} is not a file", path.display())]
    NotAFile { path: PathBuf },
    #[error("upload failed: {0}")]
    Upload(#[source] ProtocolError),
    #[error("sending the file failed: {0}")]
    Send(#[source] ProtocolError),
    #[error("download failed: {0}")]
    Download(#[source] ProtocolError),
}

/// One progress observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: u64,
    pub total: u64,
}

impl Progress {
    /// Completed fraction in `[0, 1]`. An empty transfer counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.done.min(self.total) as f64) / (self.total as f64)
    }

    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }
}

/// Normalizes raw progress reports before they reach a sink.
pub struct ProgressTracker {
    sink: ProgressSink,
    last: Mutex<Option<Progress>>,
}

impl ProgressTracker {
    pub fn new(sink: ProgressSink) -> Arc<Self> {
        Arc::new(Self {
            sink,
            last: Mutex::new(None),
        })
    }

    /// A sink to hand to the protocol layer.
    pub fn as_sink(self: &Arc<Self>) -> ProgressSink {
        let tracker = Arc::clone(self);
        Arc::new(move |done, total| tracker.report(done, total))
    }

    pub fn report(&self, done: u64, total: u64) {
        let next = {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            let previous = *last;
            let floor = previous.map(|progress| progress.done).unwrap_or(0);
            let known_total = previous.map(|progress| progress.total).unwrap_or(0);
            // A zero total alongside progress means the size is unknown.
            // Totals only grow once seen.
            let total = (if total == 0 { done } else { total }).max(floor).max(known_total);
            let done = done.max(floor).min(total);
            let next = Progress { done, total };
            if previous == Some(next) {
                return;
            }
            *last = Some(next);
            next
        };
        (self.sink)(next.done, next.total);
    }

    /// Emits the terminal `done == total` report unless it was already sent.
    pub fn finish(&self, total: Option<u64>) {
        let last = *self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let total = match (total, last) {
            (Some(total), Some(last)) => total.max(last.total).max(last.done),
            (Some(total), None) => total,
            (None, Some(last)) => last.total.max(last.done),
            (None, None) => 0,
        };
        self.report(total, total);
    }

    pub fn last(&self) -> Option<Progress> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wraps protocol transfers with file checks and progress normalization.
#[derive(Clone)]
pub struct MediaTransfer {
    client: Arc<dyn ProtocolClient>,
}

impl MediaTransfer {
    pub fn new(client: Arc<dyn ProtocolClient>) -> Self {
        Self { client }
    }

    pub async fn upload(
        &self,
        path: &Path,
        kind: UploadKind,
        progress: ProgressSink,
    ) -> Result<FileHandle, TransferError> {
        let not_found = |source: io::Error| TransferError::FileNotFound {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(not_found)?;
        let metadata = file.metadata().await.map_err(not_found)?;
        drop(file);
        if !metadata.is_file() {
            return Err(TransferError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let tracker = ProgressTracker::new(progress);
        let handle = self
            .client
            .upload_file(path, kind, tracker.as_sink())
            .await
            .map_err(TransferError::Upload)?;
        tracker.finish(Some(metadata.len()));
        debug!(file = %handle.file_name, size = handle.size, "upload finished");
        Ok(handle)
    }

    pub async fn send_photo(&self, path: &Path, peer: &Entity, progress: ProgressSink) -> Result<(), TransferError> {
        self.send_upload(path, peer, UploadKind::Photo, progress).await
    }

    pub async fn send_document(
        &self,
        path: &Path,
        peer: &Entity,
        progress: ProgressSink,
    ) -> Result<(), TransferError> {
        self.send_upload(path, peer, UploadKind::Document, progress).await
    }

    async fn send_upload(
        &self,
        path: &Path,
        peer: &Entity,
        kind: UploadKind,
        progress: ProgressSink,
    ) -> Result<(), TransferError> {
        let handle = self.upload(path, kind, progress).await?;
        self.client.send_file(peer, &handle).await.map_err(TransferError::Send)
    }

    pub async fn download(
        &self,
        media: &MediaItem,
        destination: &Path,
        progress: ProgressSink,
    ) -> Result<PathBuf, TransferError> {
        let tracker = ProgressTracker::new(progress);
        let saved = self
            .client
            .download_media(media, destination, tracker.as_sink())
            .await
            .map_err(TransferError::Download)?;
        tracker.finish(media.file().size.filter(|_| tracker.last().is_none()));
        debug!(path = %saved.display(), "download finished");
        Ok(saved)
    }

    /// `Ok(None)` when the peer has no profile photo.
    pub async fn download_profile_photo(
        &self,
        entity: &Entity,
        destination: &Path,
    ) -> Result<Option<PathBuf>, TransferError> {
        match self.client.download_profile_photo(entity, destination).await {
            Ok(saved) => Ok(saved),
            Err(error) => {
                warn!(%error, peer_id = entity.id, "profile photo download failed");
                Err(TransferError::Download(error))
            }
        }
    }
}
