//! The library source
//!
//! Owns the settings, the import queue and the transfer worker, and
//! decides what happens to URIs and tracks handed to the library: known
//! entries are copied into the layout, unknown URIs are imported.

use crate::catalog::Catalog;
use crate::config::{LibrarySettings, SettingKey};
use crate::import::{
    ImportEvent, ImportProgress, ImportQueue, JobId, JobSummary, MetadataScanner, QueueError,
    QueueOptions,
};
use crate::layout::{LayoutError, LibraryLayout};
use crate::model::{Entry, EntryType, Track};
use crate::transfer::{
    BatchHandle, Severity, TrackDisposition, TrackTransfer, TransferBatch, TransferError,
    TransferHandler,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Score returned by [`LibrarySource::want_uri`] for URIs the library takes
pub const WANT_URI_SCORE: u32 = 50;

/// URI schemes treated like local files
const REMOTE_SCHEMES: &[&str] = &["smb://", "sftp://", "ssh://"];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot copy into the library: {0}")]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// A transfer failure worth telling the user about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub source: String,
    pub dest: String,
    pub message: String,
    /// The rest of the batch was cancelled because of this error
    pub fatal: bool,
}

/// Receiving ends of the source's notifications
#[derive(Debug)]
pub struct SourceChannels {
    pub import_events: mpsc::UnboundedReceiver<ImportEvent>,
    pub transfer_reports: mpsc::UnboundedReceiver<TransferReport>,
}

/// Called with the new settings and the keys that changed
pub type SettingsObserver = Box<dyn Fn(&LibrarySettings, &[SettingKey]) + Send + Sync>;

pub struct LibrarySource {
    settings: LibrarySettings,
    catalog: Arc<dyn Catalog>,
    import: ImportQueue,
    transfer: Arc<dyn TrackTransfer>,
    observers: Vec<SettingsObserver>,
    reports: mpsc::UnboundedSender<TransferReport>,
}

impl LibrarySource {
    /// Create the source and spawn its import queue on the current runtime
    pub fn new(
        settings: LibrarySettings,
        catalog: Arc<dyn Catalog>,
        scanner: Arc<dyn MetadataScanner>,
        transfer: Arc<dyn TrackTransfer>,
    ) -> (Self, SourceChannels) {
        let (import, import_events) =
            ImportQueue::spawn(Arc::clone(&catalog), scanner, QueueOptions::from(&settings));
        let (reports, transfer_reports) = mpsc::unbounded_channel();

        let source = Self {
            settings,
            catalog,
            import,
            transfer,
            observers: Vec::new(),
            reports,
        };
        let channels = SourceChannels {
            import_events,
            transfer_reports,
        };
        (source, channels)
    }

    pub fn settings(&self) -> &LibrarySettings {
        &self.settings
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    pub fn import_queue(&self) -> &ImportQueue {
        &self.import
    }

    /// Layout built from the current settings
    pub fn layout(&self) -> Result<LibraryLayout, LayoutError> {
        LibraryLayout::from_settings(&self.settings)
    }

    /// Example path for the configured layout
    pub fn layout_example(&self) -> Result<String, LayoutError> {
        Ok(self.layout()?.example_path())
    }

    /// Whether tracks can be copied into the library at all
    pub fn can_paste(&self) -> bool {
        match self.layout() {
            Ok(_) => true,
            Err(e) => {
                log::debug!("Library can't accept pasted tracks: {}", e);
                false
            }
        }
    }

    /// Copy entries into the library layout
    ///
    /// Only entries owned by another source are copied: the library's own
    /// songs are skipped, as are entries the transfer worker can't read.
    /// Returns `None` if nothing was left to copy.
    pub fn paste(&self, entries: Vec<Entry>) -> Result<Option<BatchHandle>, SourceError> {
        let layout = self.layout()?;

        let mut batch = TransferBatch::new();
        for entry in entries {
            match entry.entry_type {
                EntryType::External => {}
                EntryType::Song => {
                    log::debug!("Can't copy {} to itself", entry.location());
                    continue;
                }
                EntryType::Ignore | EntryType::ImportError => {
                    log::debug!("Not copying non-song entry {}", entry.location());
                    continue;
                }
            }
            if !self.transfer.can_copy(&entry.track) {
                log::debug!("Source refuses to copy {}", entry.location());
                continue;
            }
            batch.add(entry.track);
        }

        let handler = LibraryTarget {
            layout,
            import: self.import.clone(),
            reports: self.reports.clone(),
        };
        Ok(batch.start(Arc::clone(&self.transfer), Arc::new(handler)))
    }

    /// Handle URIs dropped onto the library
    ///
    /// URIs the catalog already knows are pasted, when the library can
    /// take pasted entries; everything else goes to the import queue.
    pub async fn receive_uris<I, S>(&self, uris: I) -> Result<Option<BatchHandle>, SourceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut known = Vec::new();
        for uri in uris {
            let uri = uri.into();
            match self.catalog.lookup(&uri) {
                Some(entry) => {
                    log::debug!("Adding known entry {} to the library", uri);
                    known.push(entry);
                }
                None => {
                    log::debug!("Importing dropped URI {}", uri);
                    self.import.add_uri(uri).await?;
                }
            }
        }

        if known.is_empty() {
            return Ok(None);
        }
        if !self.can_paste() {
            log::debug!("Dropping {} known entries, library can't paste", known.len());
            return Ok(None);
        }
        self.paste(known)
    }

    /// Import a URI into the catalog
    pub async fn add_uri(&self, uri: impl Into<String>) -> Result<JobId, SourceError> {
        Ok(self.import.add_uri(uri).await?)
    }

    /// Import a URI and get notified when its job completes
    pub async fn add_uri_notify(
        &self,
        uri: impl Into<String>,
    ) -> Result<(JobId, oneshot::Receiver<JobSummary>), SourceError> {
        Ok(self.import.add_uri_notify(uri).await?)
    }

    /// How much the library wants to take a URI, 0 for not at all
    pub fn want_uri(&self, uri: &str) -> u32 {
        let local = uri.starts_with('/') || uri.starts_with("file://");
        if local || REMOTE_SCHEMES.iter().any(|scheme| uri.starts_with(scheme)) {
            WANT_URI_SCORE
        } else {
            0
        }
    }

    /// Progress of the import job at the head of the queue
    pub async fn status(&self) -> Result<Option<ImportProgress>, SourceError> {
        Ok(self.import.status().await?)
    }

    /// Register a callback for settings changes
    pub fn subscribe(&mut self, observer: SettingsObserver) {
        self.observers.push(observer);
    }

    /// Replace the settings and notify observers of what changed
    pub fn update_settings(&mut self, settings: LibrarySettings) -> Vec<SettingKey> {
        let changed = self.settings.changed_keys(&settings);
        if changed.is_empty() {
            return changed;
        }

        log::info!("Library settings changed: {:?}", changed);
        self.settings = settings;

        let queue_changed = changed
            .iter()
            .any(|key| matches!(key, SettingKey::ImportDelay | SettingKey::ScanConcurrency));
        if queue_changed {
            if let Err(e) = self.import.set_options(QueueOptions::from(&self.settings)) {
                log::warn!("Failed to update import queue: {}", e);
            }
        }

        for observer in &self.observers {
            observer(&self.settings, &changed);
        }
        changed
    }
}

impl Drop for LibrarySource {
    fn drop(&mut self) {
        // Outstanding batches may still hold a queue handle
        let _ = self.import.cancel_all();
    }
}

/// Sends transferred tracks into the library and applies the error policy
struct LibraryTarget {
    layout: LibraryLayout,
    import: ImportQueue,
    reports: mpsc::UnboundedSender<TransferReport>,
}

impl LibraryTarget {
    fn report(&self, track: &Track, dest: &str, error: &TransferError, fatal: bool) {
        let _ = self.reports.send(TransferReport {
            source: track.location.clone(),
            dest: dest.to_string(),
            message: error.to_string(),
            fatal,
        });
    }
}

impl TransferHandler for LibraryTarget {
    fn dest_uri(&self, track: &Track, extension: Option<&str>) -> Option<String> {
        let dest = self.layout.destination_uri(track, extension);
        match &dest {
            Some(uri) => log::debug!("Destination for {} is {}", track.location, uri),
            None => log::warn!("Unable to build destination for {}", track.location),
        }
        dest
    }

    fn track_done(
        &self,
        track: &Track,
        dest: &str,
        result: &Result<u64, TransferError>,
    ) -> TrackDisposition {
        let error = match result {
            Ok(_) => {
                // Scan the new file rather than copying the old record
                if let Err(e) = self.import.enqueue(dest) {
                    log::warn!("Unable to import {}: {}", dest, e);
                }
                return TrackDisposition::Continue;
            }
            Err(e) => e,
        };

        match error.severity() {
            Severity::Fatal => {
                log::warn!("Transfer of {} failed, stopping: {}", track.location, error);
                self.report(track, dest, error, true);
                TrackDisposition::CancelBatch
            }
            Severity::Duplicate => {
                log::debug!("Skipping {}: {}", track.location, error);
                TrackDisposition::Continue
            }
            Severity::Reportable => {
                log::warn!("Transfer of {} failed: {}", track.location, error);
                self.report(track, dest, error, false);
                TrackDisposition::Continue
            }
        }
    }
}
