use std::io;
use thiserror::Error;

/// Why a single track transfer failed
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("out of space on the destination device")]
    OutOfSpace,

    #[error("destination is read-only")]
    DestinationReadOnly,

    #[error("destination already exists: {0}")]
    DestinationExists(String),

    #[error("source file not found: {0}")]
    SourceMissing(String),

    #[error("cannot transfer location: {0}")]
    UnsupportedLocation(String),

    #[error("transfer worker failed: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// How a transfer failure affects the rest of its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Nothing else in the batch can succeed either
    Fatal,

    /// The file is already there; skip without telling anyone
    Duplicate,

    /// Report it and carry on with the next track
    Reportable,
}

impl TransferError {
    /// Classify an I/O error raised while writing `dest`
    pub fn from_io(err: io::Error, dest: &str) -> Self {
        match err.kind() {
            io::ErrorKind::StorageFull => TransferError::OutOfSpace,
            io::ErrorKind::ReadOnlyFilesystem | io::ErrorKind::PermissionDenied => {
                TransferError::DestinationReadOnly
            }
            io::ErrorKind::AlreadyExists => TransferError::DestinationExists(dest.to_string()),
            _ => TransferError::Io(err),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            TransferError::OutOfSpace | TransferError::DestinationReadOnly => Severity::Fatal,
            TransferError::DestinationExists(_) => Severity::Duplicate,
            _ => Severity::Reportable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        let dest = "file:///music/a.ogg";
        let full = TransferError::from_io(io::Error::from(io::ErrorKind::StorageFull), dest);
        assert_eq!(full.severity(), Severity::Fatal);

        let ro = TransferError::from_io(io::Error::from(io::ErrorKind::PermissionDenied), dest);
        assert!(matches!(ro, TransferError::DestinationReadOnly));
        assert_eq!(ro.severity(), Severity::Fatal);

        let exists = TransferError::from_io(io::Error::from(io::ErrorKind::AlreadyExists), dest);
        assert_eq!(exists.severity(), Severity::Duplicate);

        let other = TransferError::from_io(io::Error::from(io::ErrorKind::Interrupted), dest);
        assert_eq!(other.severity(), Severity::Reportable);
    }
}
