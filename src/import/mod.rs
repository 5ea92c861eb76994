//! Catalog import
//!
//! URIs handed to the library are scanned for metadata in batched jobs.
//! Requests arriving close together share one job, which starts after a
//! short delay; scan failures become error entries instead of failing
//! the batch.

mod job;
mod queue;
mod scanner;

pub use job::{
    EntryTypes, ImportJob, ImportProgress, JobId, JobSnapshot, JobState, JobSummary,
};
pub use queue::{ImportEvent, ImportQueue, QueueError, QueueOptions};
pub use scanner::{is_audio_file, scan_path, MetadataScanner, ScanError, TagScanner};
