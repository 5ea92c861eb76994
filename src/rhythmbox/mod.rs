//! Rhythmbox library loading
//!
//! Parses Rhythmbox's XML database into the catalog model so existing
//! entries can be laid out, copied and re-imported.

mod database;
mod model;

pub use database::{parse_database, parse_reader};

use crate::catalog::MemoryCatalog;
use anyhow::Result;
use std::path::Path;

/// Load a rhythmdb.xml file into an in-memory catalog
///
/// # Arguments
/// * `db_path` - Path to rhythmdb.xml (typically ~/.local/share/rhythmbox/rhythmdb.xml)
pub fn load_catalog(db_path: &Path) -> Result<MemoryCatalog> {
    log::info!("Parsing Rhythmbox database from {:?}", db_path);
    let library = database::parse_database(db_path)?;
    Ok(MemoryCatalog::from_library(library))
}
