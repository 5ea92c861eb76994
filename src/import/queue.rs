//! Coalescing import queue
//!
//! All job state lives in one control task. Callers talk to it through an
//! [`ImportQueue`] handle; it reports back through [`ImportEvent`]s. URIs
//! added while a job is still pending join that job, and every addition
//! pushes its start back by the debounce delay.

use super::job::{
    EntryTypes, ImportJob, ImportProgress, JobId, JobSnapshot, JobState, JobSummary,
};
use super::scanner::{MetadataScanner, ScanError};
use crate::catalog::Catalog;
use crate::config::LibrarySettings;
use crate::model::Track;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinSet};
use tokio::time::{sleep_until, Instant};

/// Notifications from the import queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    /// The head job began scanning; later jobs start silently
    Started { job: JobId, total: usize },

    /// Progress of the head job; other jobs stay silent until they are head
    Progress(ImportProgress),

    /// A job scanned all of its URIs and was removed from the queue
    Complete(JobSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("import queue has shut down")]
    Closed,
}

/// Tunables for the queue
#[derive(Debug, Clone, Copy)]
pub struct QueueOptions {
    /// Debounce delay before a pending job starts
    pub delay: Duration,

    /// Concurrent scans per running job
    pub concurrency: usize,

    pub entry_types: EntryTypes,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self::from(&LibrarySettings::default())
    }
}

impl From<&LibrarySettings> for QueueOptions {
    fn from(settings: &LibrarySettings) -> Self {
        Self {
            delay: settings.import_delay,
            concurrency: settings.scan_concurrency.max(1),
            entry_types: EntryTypes::default(),
        }
    }
}

enum Command {
    Add {
        uri: String,
        notify: Option<oneshot::Sender<JobSummary>>,
        reply: oneshot::Sender<JobId>,
    },
    Enqueue(String),
    Cancel(JobId),
    CancelAll,
    SetOptions(QueueOptions),
    Status(oneshot::Sender<Option<ImportProgress>>),
    Jobs(oneshot::Sender<Vec<JobSnapshot>>),
}

/// Handle to the import control task
///
/// Cloning is cheap. The control task stops, cancelling whatever is left,
/// once every handle is dropped.
#[derive(Debug, Clone)]
pub struct ImportQueue {
    commands: mpsc::UnboundedSender<Command>,
}

impl ImportQueue {
    /// Spawn the control task on the current tokio runtime
    pub fn spawn(
        catalog: Arc<dyn Catalog>,
        scanner: Arc<dyn MetadataScanner>,
        options: QueueOptions,
    ) -> (Self, mpsc::UnboundedReceiver<ImportEvent>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            jobs: Vec::new(),
            pending: None,
            start_at: None,
            next_id: 1,
            options,
            catalog,
            scanner,
            scans: JoinSet::new(),
            abort_handles: HashMap::new(),
            events,
        };
        tokio::spawn(driver.run(command_rx));

        (Self { commands }, event_rx)
    }

    /// Queue a URI for import; returns the job it joined
    pub async fn add_uri(&self, uri: impl Into<String>) -> Result<JobId, QueueError> {
        self.add(uri.into(), None).await
    }

    /// Queue a URI and get a receiver that fires when its job completes
    ///
    /// The receiver errors if the job is cancelled instead.
    pub async fn add_uri_notify(
        &self,
        uri: impl Into<String>,
    ) -> Result<(JobId, oneshot::Receiver<JobSummary>), QueueError> {
        let (tx, rx) = oneshot::channel();
        let job = self.add(uri.into(), Some(tx)).await?;
        Ok((job, rx))
    }

    /// Queue a URI without waiting for the job id
    ///
    /// Usable from synchronous code such as transfer callbacks.
    pub fn enqueue(&self, uri: impl Into<String>) -> Result<(), QueueError> {
        self.send(Command::Enqueue(uri.into()))
    }

    async fn add(
        &self,
        uri: String,
        notify: Option<oneshot::Sender<JobSummary>>,
    ) -> Result<JobId, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Add { uri, notify, reply })?;
        rx.await.map_err(|_| QueueError::Closed)
    }

    /// Cancel one job; it emits no further events
    pub fn cancel(&self, job: JobId) -> Result<(), QueueError> {
        self.send(Command::Cancel(job))
    }

    /// Cancel every job and the pending start
    pub fn cancel_all(&self) -> Result<(), QueueError> {
        self.send(Command::CancelAll)
    }

    /// Replace the queue tunables; running jobs keep their entry types
    pub fn set_options(&self, options: QueueOptions) -> Result<(), QueueError> {
        self.send(Command::SetOptions(options))
    }

    /// Progress of the head job, if any job is queued
    pub async fn status(&self) -> Result<Option<ImportProgress>, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status(reply))?;
        rx.await.map_err(|_| QueueError::Closed)
    }

    /// All active jobs, oldest first
    pub async fn jobs(&self) -> Result<Vec<JobSnapshot>, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Jobs(reply))?;
        rx.await.map_err(|_| QueueError::Closed)
    }

    fn send(&self, command: Command) -> Result<(), QueueError> {
        self.commands.send(command).map_err(|_| QueueError::Closed)
    }
}

struct ScanResult {
    job: JobId,
    uri: String,
    outcome: Result<Track, ScanError>,
}

struct Driver {
    /// Active jobs, oldest first; the first one is the head
    jobs: Vec<ImportJob>,
    pending: Option<JobId>,
    start_at: Option<Instant>,
    next_id: JobId,
    options: QueueOptions,
    catalog: Arc<dyn Catalog>,
    scanner: Arc<dyn MetadataScanner>,
    scans: JoinSet<ScanResult>,
    abort_handles: HashMap<JobId, Vec<AbortHandle>>,
    events: mpsc::UnboundedSender<ImportEvent>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let start_at = self.start_at;
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => {
                        log::debug!("Import queue handles dropped, shutting down");
                        self.cancel_all();
                        break;
                    }
                },
                _ = sleep_until(start_at.unwrap_or_else(Instant::now)), if start_at.is_some() => {
                    self.start_pending();
                }
                Some(joined) = self.scans.join_next(), if !self.scans.is_empty() => match joined {
                    Ok(result) => self.scan_finished(result),
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => log::warn!("Metadata scan task failed: {}", e),
                },
            }
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Add { uri, notify, reply } => {
                let id = self.add_uri(uri, notify);
                let _ = reply.send(id);
            }
            Command::Enqueue(uri) => {
                self.add_uri(uri, None);
            }
            Command::Cancel(id) => self.cancel(id),
            Command::CancelAll => self.cancel_all(),
            Command::SetOptions(options) => {
                log::debug!("Import queue options changed: {:?}", options);
                self.options = options;
            }
            Command::Status(reply) => {
                let _ = reply.send(self.jobs.first().map(ImportJob::progress));
            }
            Command::Jobs(reply) => {
                let _ = reply.send(self.jobs.iter().map(ImportJob::snapshot).collect());
            }
        }
    }

    fn add_uri(&mut self, uri: String, notify: Option<oneshot::Sender<JobSummary>>) -> JobId {
        let id = match self.pending {
            Some(id) => {
                log::debug!("Using existing unstarted import job {}", id);
                id
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                log::debug!("Creating new import job {}", id);
                self.jobs.push(ImportJob::new(id, self.options.entry_types));
                self.pending = Some(id);
                id
            }
        };

        if let Some(job) = self.job_mut(id) {
            log::debug!("Adding {} to import job {}", uri, id);
            job.add_uri(uri);
            if let Some(sender) = notify {
                job.notify_on_complete(sender);
            }
        }

        // Allow some time for more URIs to be added
        self.start_at = Some(Instant::now() + self.options.delay);
        id
    }

    fn start_pending(&mut self) {
        self.start_at = None;
        let Some(id) = self.pending.take() else {
            return;
        };
        let Some(job) = self.job_mut(id) else {
            return;
        };
        if !job.start() {
            return;
        }

        let total = job.total();
        log::info!("Starting import job {} ({} URIs)", id, total);
        self.fill(id);
        if self.is_head(id) {
            self.emit(ImportEvent::Started { job: id, total });
            self.emit_progress(id);
        }
    }

    /// Keep up to `concurrency` scans in flight for a job
    fn fill(&mut self, id: JobId) {
        let concurrency = self.options.concurrency.max(1);
        loop {
            let Some(job) = self.job_mut(id) else {
                return;
            };
            if job.in_flight() >= concurrency {
                return;
            }
            let Some(uri) = job.next_uri() else {
                return;
            };

            let scanner = Arc::clone(&self.scanner);
            let handle = self.scans.spawn_blocking(move || {
                let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| scanner.scan(&uri)))
                    .unwrap_or_else(|_| {
                        Err(ScanError::Read {
                            uri: uri.clone(),
                            message: "scanner panicked".to_string(),
                        })
                    });
                ScanResult {
                    job: id,
                    uri,
                    outcome,
                }
            });
            self.abort_handles.entry(id).or_default().push(handle);
        }
    }

    fn scan_finished(&mut self, result: ScanResult) {
        let ScanResult { job: id, uri, outcome } = result;

        let Some(job) = self.job_mut(id) else {
            log::debug!("Dropping scan result for inactive import job {}: {}", id, uri);
            return;
        };
        if job.state() != JobState::Running {
            return;
        }

        if let Err(e) = &outcome {
            log::debug!("Scan of {} failed: {}", uri, e);
        }
        let entry = job.record(&uri, outcome);
        self.catalog.commit(entry);

        self.fill(id);

        let finished = self.job_mut(id).is_some_and(|job| job.is_finished());
        if finished {
            self.complete(id);
        } else if self.is_head(id) {
            self.emit_progress(id);
        }
    }

    fn complete(&mut self, id: JobId) {
        let Some(index) = self.jobs.iter().position(|job| job.id() == id) else {
            return;
        };
        let mut job = self.jobs.remove(index);
        self.abort_handles.remove(&id);

        let summary = job.complete();
        log::info!(
            "Import job {} complete: {} of {} imported ({} ignored, {} failed)",
            id,
            summary.imported,
            summary.total,
            summary.ignored,
            summary.failed
        );
        self.emit(ImportEvent::Complete(summary));

        if index == 0 {
            self.surface_new_head();
        }
    }

    fn cancel(&mut self, id: JobId) {
        let Some(index) = self.jobs.iter().position(|job| job.id() == id) else {
            return;
        };
        let mut job = self.jobs.remove(index);
        job.cancel();
        log::info!("Cancelled import job {}", id);

        if let Some(handles) = self.abort_handles.remove(&id) {
            for handle in handles {
                handle.abort();
            }
        }
        if self.pending == Some(id) {
            self.pending = None;
            self.start_at = None;
        }

        if index == 0 {
            self.surface_new_head();
        }
    }

    fn cancel_all(&mut self) {
        self.start_at = None;
        self.pending = None;
        for mut job in self.jobs.drain(..) {
            job.cancel();
        }
        for (_, handles) in self.abort_handles.drain() {
            for handle in handles {
                handle.abort();
            }
        }
    }

    /// A running job that just became head reports where it is
    fn surface_new_head(&mut self) {
        let head = self
            .jobs
            .first()
            .filter(|job| job.state() == JobState::Running)
            .map(ImportJob::id);
        if let Some(id) = head {
            self.emit_progress(id);
        }
    }

    fn job_mut(&mut self, id: JobId) -> Option<&mut ImportJob> {
        self.jobs.iter_mut().find(|job| job.id() == id)
    }

    fn is_head(&self, id: JobId) -> bool {
        self.jobs.first().is_some_and(|job| job.id() == id)
    }

    fn emit_progress(&self, id: JobId) {
        if let Some(job) = self.jobs.iter().find(|job| job.id() == id) {
            self.emit(ImportEvent::Progress(job.progress()));
        }
    }

    fn emit(&self, event: ImportEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}
