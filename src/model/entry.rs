use super::Track;
use serde::{Deserialize, Serialize};

/// Classification of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// A playable song in the library
    Song,

    /// A file that was scanned but is not media (cover art, playlists, ...)
    Ignore,

    /// A file that could not be scanned
    ImportError,

    /// A track owned by another source, such as a device or another
    /// player's database; it can be copied into the library
    External,
}

/// A catalog record: a track plus how it was classified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub track: Track,
    pub entry_type: EntryType,

    /// Scan error message for `ImportError` entries
    pub error: Option<String>,
}

impl Entry {
    pub fn song(track: Track) -> Self {
        Self {
            track,
            entry_type: EntryType::Song,
            error: None,
        }
    }

    pub fn external(track: Track) -> Self {
        Self {
            track,
            entry_type: EntryType::External,
            error: None,
        }
    }

    pub fn location(&self) -> &str {
        &self.track.location
    }
}
