//! Catalog collaborator
//!
//! The import queue and library source only look entries up and commit
//! new ones; storage belongs to the implementation.

use crate::model::{Entry, Library};
use std::sync::RwLock;

/// Entry lookup and commit, shared between the control task and callers
pub trait Catalog: Send + Sync {
    /// Look up an entry by location URI
    fn lookup(&self, location: &str) -> Option<Entry>;

    /// Insert or replace an entry
    fn commit(&self, entry: Entry);
}

/// Catalog backed by an in-memory [`Library`]
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    library: RwLock<Library>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already loaded library (e.g. from rhythmdb.xml)
    pub fn from_library(library: Library) -> Self {
        Self {
            library: RwLock::new(library),
        }
    }

    /// Copy of the current library contents
    pub fn snapshot(&self) -> Library {
        self.library
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl Catalog for MemoryCatalog {
    fn lookup(&self, location: &str) -> Option<Entry> {
        let lib = self.library.read().unwrap_or_else(|p| p.into_inner());
        lib.get(location).cloned()
    }

    fn commit(&self, entry: Entry) {
        log::debug!("Committing {:?} entry {}", entry.entry_type, entry.location());
        let mut lib = self.library.write().unwrap_or_else(|p| p.into_inner());
        lib.insert(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntryType, Track};

    #[test]
    fn test_commit_replaces_entry() {
        let catalog = MemoryCatalog::new();
        let mut track = Track::new("file:///music/a.ogg");
        track.title = "Old".to_string();
        catalog.commit(Entry::song(track.clone()));

        track.title = "New".to_string();
        catalog.commit(Entry::song(track));

        let entry = catalog.lookup("file:///music/a.ogg").unwrap();
        assert_eq!(entry.track.title, "New");
        assert_eq!(entry.entry_type, EntryType::Song);
        assert_eq!(catalog.snapshot().len(), 1);
    }
}
