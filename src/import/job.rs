//! Import job state
//!
//! One job is a batch of URIs scanned into the catalog together. The job
//! itself does no I/O; the queue feeds it URIs to scan and scan results.

use super::scanner::ScanError;
use crate::model::{track_id, Entry, EntryType, Track};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// Identifies an import job within its queue
pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    /// Accepting URIs, waiting for the debounce delay
    Pending,
    Running,
    Complete,
    Cancelled,
}

/// Entry types assigned to scan outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTypes {
    pub success: EntryType,
    pub ignore: EntryType,
    pub error: EntryType,
}

impl Default for EntryTypes {
    fn default() -> Self {
        Self {
            success: EntryType::Song,
            ignore: EntryType::Ignore,
            error: EntryType::ImportError,
        }
    }
}

/// Progress of a running job, as surfaced to the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    pub job: JobId,
    pub total: usize,
    /// URIs scanned so far, successful or not
    pub processed: usize,
}

impl ImportProgress {
    /// Fraction done, 0.0 to 1.0
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f32 / self.total as f32
        }
    }
}

/// Final counts of a completed job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub job: JobId,
    pub total: usize,
    pub imported: usize,
    pub ignored: usize,
    pub failed: usize,
}

/// Point-in-time view of a job in the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub state: JobState,
    pub uris: Vec<String>,
}

/// A batch of URIs to scan into the catalog
#[derive(Debug)]
pub struct ImportJob {
    id: JobId,
    state: JobState,
    entry_types: EntryTypes,
    uris: Vec<String>,
    queued: VecDeque<String>,
    in_flight: usize,
    processed: usize,
    imported: usize,
    ignored: usize,
    failed: usize,
    notify: Vec<oneshot::Sender<JobSummary>>,
}

impl ImportJob {
    pub fn new(id: JobId, entry_types: EntryTypes) -> Self {
        Self {
            id,
            state: JobState::Pending,
            entry_types,
            uris: Vec::new(),
            queued: VecDeque::new(),
            in_flight: 0,
            processed: 0,
            imported: 0,
            ignored: 0,
            failed: 0,
            notify: Vec::new(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn total(&self) -> usize {
        self.uris.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Add a URI to a pending job; duplicates are accepted once
    ///
    /// Returns false if the job has already started.
    pub fn add_uri(&mut self, uri: impl Into<String>) -> bool {
        if self.state != JobState::Pending {
            return false;
        }
        let uri = uri.into();
        if !self.uris.contains(&uri) {
            self.uris.push(uri);
        }
        true
    }

    /// Register a sender that receives the summary when the job completes
    pub fn notify_on_complete(&mut self, sender: oneshot::Sender<JobSummary>) {
        self.notify.push(sender);
    }

    /// Move from pending to running; all URIs become scannable
    pub fn start(&mut self) -> bool {
        if self.state != JobState::Pending {
            return false;
        }
        self.state = JobState::Running;
        self.queued = self.uris.iter().cloned().collect();
        true
    }

    /// Next URI to hand to the scanner
    pub fn next_uri(&mut self) -> Option<String> {
        if self.state != JobState::Running {
            return None;
        }
        let uri = self.queued.pop_front()?;
        self.in_flight += 1;
        Some(uri)
    }

    /// Record a scan outcome and build the catalog entry for it
    ///
    /// Failures never abort the job; they become entries of the error or
    /// ignore type.
    pub fn record(&mut self, uri: &str, outcome: Result<Track, ScanError>) -> Entry {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.processed += 1;

        match outcome {
            Ok(mut track) => {
                self.imported += 1;
                track.location = uri.to_string();
                track.id = track_id(uri);
                Entry {
                    track,
                    entry_type: self.entry_types.success,
                    error: None,
                }
            }
            Err(e) if e.is_ignorable() => {
                self.ignored += 1;
                Entry {
                    track: placeholder_track(uri),
                    entry_type: self.entry_types.ignore,
                    error: None,
                }
            }
            Err(e) => {
                self.failed += 1;
                Entry {
                    track: placeholder_track(uri),
                    entry_type: self.entry_types.error,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// All URIs scanned
    pub fn is_finished(&self) -> bool {
        self.state == JobState::Running && self.processed >= self.total()
    }

    /// Mark complete and hand out the summary to everyone waiting on it
    pub fn complete(&mut self) -> JobSummary {
        self.state = JobState::Complete;
        let summary = self.summary();
        for sender in self.notify.drain(..) {
            let _ = sender.send(summary);
        }
        summary
    }

    /// Stop the job; queued URIs are dropped and waiters are released
    pub fn cancel(&mut self) {
        self.state = JobState::Cancelled;
        self.queued.clear();
        self.notify.clear();
    }

    pub fn progress(&self) -> ImportProgress {
        ImportProgress {
            job: self.id,
            total: self.total(),
            processed: self.processed,
        }
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job: self.id,
            total: self.total(),
            imported: self.imported,
            ignored: self.ignored,
            failed: self.failed,
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            state: self.state,
            uris: self.uris.clone(),
        }
    }
}

/// Track for a URI that could not be scanned, titled after its file name
fn placeholder_track(uri: &str) -> Track {
    let mut track = Track::new(uri);
    let name = uri.rsplit('/').next().unwrap_or(uri);
    track.title = urlencoding::decode(name)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| name.to_string());
    track
}
