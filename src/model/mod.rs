//! Catalog data model
//!
//! Tracks and catalog entries, independent of where the metadata came
//! from (rhythmdb.xml or a tag scan).

mod entry;
mod library;
mod track;

pub use entry::{Entry, EntryType};
pub use library::Library;
pub use track::{fold, path_to_uri, track_id, uri_to_path, Track};
