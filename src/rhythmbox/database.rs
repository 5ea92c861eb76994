//! Rhythmbox database (rhythmdb.xml) parser

use super::model::RhythmboxEntry;
use crate::model::{Entry, EntryType, Library};
use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Parse rhythmdb.xml into a library of song, ignore and import-error entries
pub fn parse_database(path: &Path) -> Result<Library> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open Rhythmbox database: {:?}", path))?;

    let library = parse_reader(BufReader::new(file))?;
    log::info!(
        "Parsed {} entries ({} songs) from Rhythmbox database",
        library.len(),
        library.track_count()
    );
    Ok(library)
}

/// Parse rhythmdb XML from any buffered reader
pub fn parse_reader<R: BufRead>(input: R) -> Result<Library> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut library = Library::new();
    let mut current: Option<(EntryType, RhythmboxEntry)> = None;
    let mut current_element = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match name.as_ref() {
                    b"entry" => {
                        // Only entry types the library source deals with
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"type" {
                                current = entry_type(attr.value.as_ref())
                                    .map(|t| (t, RhythmboxEntry::new()));
                                break;
                            }
                        }
                    }
                    _ => {
                        // Track element name for text content
                        if current.is_some() {
                            current_element = String::from_utf8_lossy(name.as_ref()).to_string();
                        }
                    }
                }
            }

            Ok(Event::Text(e)) => {
                if let Some((_, ref mut entry)) = current {
                    let text = e.unescape().unwrap_or_default().to_string();
                    apply_field(entry, &current_element, text);
                }
            }

            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"entry" {
                    // Entry complete, convert to Track
                    if let Some((entry_type, entry)) = current.take() {
                        if let Some(track) = entry.into_track() {
                            library.insert(Entry {
                                track,
                                entry_type,
                                error: None,
                            });
                        }
                    }
                }
                current_element.clear();
            }

            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!(
                    "XML parsing error at position {}: {:?}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
            _ => {}
        }

        buf.clear();
    }

    Ok(library)
}

fn entry_type(value: &[u8]) -> Option<EntryType> {
    match value {
        b"song" => Some(EntryType::Song),
        b"ignore" => Some(EntryType::Ignore),
        b"import-error" => Some(EntryType::ImportError),
        _ => None,
    }
}

/// Populate entry based on current element name
fn apply_field(entry: &mut RhythmboxEntry, element: &str, text: String) {
    match element {
        "title" => entry.title = Some(text),
        "artist" => entry.artist = Some(text),
        "album" => entry.album = Some(text),
        "album-artist" => entry.album_artist = Some(text),
        "mb-artistsortname" => entry.artist_sortname = Some(text),
        "mb-albumartistsortname" => entry.album_artist_sortname = Some(text),
        "genre" => entry.genre = Some(text),
        "location" => entry.location = Some(text),
        "media-type" => entry.media_type = Some(text),
        "duration" => entry.duration = text.parse().ok(),
        "file-size" => entry.file_size = text.parse().ok(),
        "track-number" => entry.track_number = text.parse().ok(),
        "disc-number" => entry.disc_number = text.parse().ok(),
        "date" => entry.date = text.parse().ok(),
        _ => {}
    }
}
