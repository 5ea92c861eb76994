use super::{Entry, EntryType, Track};
use std::collections::HashMap;

/// In-memory catalog of entries keyed by location URI
#[derive(Debug, Clone, Default)]
pub struct Library {
    /// All entries indexed by their location
    entries: HashMap<String, Entry>,
}

impl Library {
    /// Create a new empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry, keyed by its location
    pub fn insert(&mut self, entry: Entry) {
        self.entries.insert(entry.location().to_string(), entry);
    }

    /// Add a track to the library as a song entry
    pub fn add_track(&mut self, track: Track) {
        self.insert(Entry::song(track));
    }

    /// Look up an entry by location URI
    pub fn get(&self, location: &str) -> Option<&Entry> {
        self.entries.get(location)
    }

    /// Get all entries
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Get all song tracks
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.entries_of(EntryType::Song).map(|e| &e.track)
    }

    /// Entries of the given type
    pub fn entries_of(&self, entry_type: EntryType) -> impl Iterator<Item = &Entry> {
        self.entries
            .values()
            .filter(move |e| e.entry_type == entry_type)
    }

    /// Total number of song entries
    pub fn track_count(&self) -> usize {
        self.entries_of(EntryType::Song).count()
    }

    /// Total number of entries of any type
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_creation() {
        let lib = Library::new();
        assert_eq!(lib.track_count(), 0);
        assert!(lib.is_empty());
    }

    #[test]
    fn test_add_track() {
        let mut lib = Library::new();

        let mut track = Track::new("file:///music/test.mp3");
        track.title = "Test Song".to_string();
        track.artist = "Test Artist".to_string();
        track.album = "Test Album".to_string();
        track.genre = Some("Electronic".to_string());
        track.duration_ms = 180000;
        track.track_number = Some(1);
        track.year = Some(2024);

        lib.add_track(track);

        assert_eq!(lib.track_count(), 1);
        let entry = lib.get("file:///music/test.mp3").unwrap();
        assert_eq!(entry.track.title, "Test Song");
        assert_eq!(entry.entry_type, EntryType::Song);
    }

    #[test]
    fn test_entries_by_type() {
        let mut lib = Library::new();
        lib.add_track(Track::new("file:///music/a.mp3"));
        lib.insert(Entry {
            track: Track::new("file:///music/cover.jpg"),
            entry_type: EntryType::Ignore,
            error: None,
        });

        assert_eq!(lib.len(), 2);
        assert_eq!(lib.track_count(), 1);
        assert_eq!(lib.entries_of(EntryType::Ignore).count(), 1);
    }
}
