//! Track transfer workers

use super::error::TransferError;
use crate::model::{uri_to_path, Track};
use std::fs::{self, OpenOptions};
use std::io;

/// Copies or encodes one track to a destination URI
///
/// Called on the blocking pool.
pub trait TrackTransfer: Send + Sync {
    /// Whether this worker can read the track's location at all
    fn can_copy(&self, track: &Track) -> bool;

    /// File extension the destination will have
    fn extension(&self, track: &Track) -> Option<String>;

    /// Transfer `source` to `dest`, returning the bytes written
    fn transfer(&self, source: &str, dest: &str) -> Result<u64, TransferError>;
}

/// Copies local files verbatim, keeping their format
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCopier;

impl FileCopier {
    pub fn new() -> Self {
        Self
    }
}

impl TrackTransfer for FileCopier {
    fn can_copy(&self, track: &Track) -> bool {
        track.file_path().is_some()
    }

    fn extension(&self, track: &Track) -> Option<String> {
        track.extension()
    }

    fn transfer(&self, source: &str, dest: &str) -> Result<u64, TransferError> {
        let source_path =
            uri_to_path(source).ok_or_else(|| TransferError::UnsupportedLocation(source.to_string()))?;
        let dest_path =
            uri_to_path(dest).ok_or_else(|| TransferError::UnsupportedLocation(dest.to_string()))?;

        if !source_path.is_file() {
            return Err(TransferError::SourceMissing(source.to_string()));
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| TransferError::from_io(e, dest))?;
        }

        let mut input = fs::File::open(&source_path)?;
        let mut output = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest_path)
            .map_err(|e| TransferError::from_io(e, dest))?;

        match io::copy(&mut input, &mut output) {
            Ok(bytes) => {
                log::debug!("Copied {:?} to {:?} ({} bytes)", source_path, dest_path, bytes);
                Ok(bytes)
            }
            Err(e) => {
                // Don't leave a truncated file behind
                drop(output);
                let _ = fs::remove_file(&dest_path);
                Err(TransferError::from_io(e, dest))
            }
        }
    }
}
