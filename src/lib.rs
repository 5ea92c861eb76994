//! rb-library - music library layout and import batching
//!
//! This library maps track metadata onto a configurable file layout,
//! imports dropped files into a catalog in coalesced background jobs and
//! copies existing tracks into the library layout.

pub mod catalog;
pub mod config;
pub mod import;
pub mod layout;
pub mod model;
pub mod rhythmbox;
pub mod source;
pub mod transfer;

pub use catalog::{Catalog, MemoryCatalog};
pub use config::LibrarySettings;
pub use layout::LibraryLayout;
pub use source::{LibrarySource, SourceChannels};
