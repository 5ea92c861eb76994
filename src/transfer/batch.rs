//! Transfer batches
//!
//! A batch copies a set of tracks one after another. The owner decides
//! where each track goes and what a failure means for the rest of the
//! batch through a [`TransferHandler`].

use super::copier::TrackTransfer;
use super::error::{Severity, TransferError};
use crate::model::Track;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// What the batch should do after a track finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackDisposition {
    Continue,
    CancelBatch,
}

/// Callbacks a batch makes into its owner
pub trait TransferHandler: Send + Sync {
    /// Destination URI for a track, or `None` to skip it
    fn dest_uri(&self, track: &Track, extension: Option<&str>) -> Option<String>;

    /// Called once per attempted transfer with its result
    fn track_done(
        &self,
        track: &Track,
        dest: &str,
        result: &Result<u64, TransferError>,
    ) -> TrackDisposition;
}

/// Outcome of a finished or cancelled batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    /// (source, destination) pairs that were written
    pub transferred: Vec<(String, String)>,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// A set of tracks to transfer into the library
#[derive(Debug, Default)]
pub struct TransferBatch {
    tracks: Vec<Track>,
}

impl TransferBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Start transferring on the current runtime
    ///
    /// An empty batch is discarded and `None` is returned.
    pub fn start(
        self,
        transfer: Arc<dyn TrackTransfer>,
        handler: Arc<dyn TransferHandler>,
    ) -> Option<BatchHandle> {
        if self.is_empty() {
            log::debug!("Discarding empty transfer batch");
            return None;
        }

        log::info!("Starting transfer batch of {} tracks", self.len());
        let cancelled = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run(self.tracks, transfer, handler, Arc::clone(&cancelled)));
        Some(BatchHandle { cancelled, task })
    }
}

/// Handle to a running batch
#[derive(Debug)]
pub struct BatchHandle {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    /// Stop after the track in progress; its result is discarded
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for the batch to finish
    pub async fn wait(self) -> BatchSummary {
        match self.task.await {
            Ok(summary) => summary,
            Err(e) => {
                log::warn!("Transfer batch task failed: {}", e);
                BatchSummary {
                    cancelled: true,
                    ..BatchSummary::default()
                }
            }
        }
    }
}

async fn run(
    tracks: Vec<Track>,
    transfer: Arc<dyn TrackTransfer>,
    handler: Arc<dyn TransferHandler>,
    cancelled: Arc<AtomicBool>,
) -> BatchSummary {
    let mut summary = BatchSummary {
        total: tracks.len(),
        ..BatchSummary::default()
    };

    for track in tracks {
        if cancelled.load(Ordering::SeqCst) {
            summary.cancelled = true;
            break;
        }

        let extension = transfer.extension(&track);
        let Some(dest) = handler.dest_uri(&track, extension.as_deref()) else {
            log::debug!("No destination for {}, skipping", track.location);
            summary.skipped += 1;
            continue;
        };

        let worker = Arc::clone(&transfer);
        let (source, target) = (track.location.clone(), dest.clone());
        let result = tokio::task::spawn_blocking(move || worker.transfer(&source, &target))
            .await
            .unwrap_or_else(|e| Err(TransferError::Worker(e.to_string())));

        // Cancelled while the copy was running
        if cancelled.load(Ordering::SeqCst) {
            summary.cancelled = true;
            break;
        }

        match &result {
            Ok(_) => summary
                .transferred
                .push((track.location.clone(), dest.clone())),
            Err(e) if e.severity() == Severity::Duplicate => summary.skipped += 1,
            Err(_) => summary.failed += 1,
        }

        if handler.track_done(&track, &dest, &result) == TrackDisposition::CancelBatch {
            cancelled.store(true, Ordering::SeqCst);
            summary.cancelled = true;
            break;
        }
    }

    log::info!(
        "Transfer batch finished: {} of {} transferred, {} skipped, {} failed{}",
        summary.transferred.len(),
        summary.total,
        summary.skipped,
        summary.failed,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
    summary
}
