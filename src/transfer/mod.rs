//! Copying catalog entries into the library layout
//!
//! A [`TransferBatch`] walks its tracks one at a time, asking a
//! [`TransferHandler`] for each destination and handing every result back
//! to it. The actual copy is done by a [`TrackTransfer`] on the blocking
//! pool.

mod batch;
mod copier;
mod error;

pub use batch::{BatchHandle, BatchSummary, TrackDisposition, TransferBatch, TransferHandler};
pub use copier::{FileCopier, TrackTransfer};
pub use error::{Severity, TransferError};
