//! Metadata scanning for import jobs
//!
//! Scanners run on the blocking pool, one call per URI.

use crate::model::{path_to_uri, uri_to_path, Track};
use lofty::file::{AudioFile, FileType, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey};
use std::path::Path;
use thiserror::Error;

/// File extensions the tag scanner treats as media
const AUDIO_EXTENSIONS: &[&str] = &[
    "aac", "aif", "aiff", "ape", "flac", "m4a", "mp3", "mp4", "mpc", "oga", "ogg", "opus", "spx",
    "wav", "wv",
];

/// Per-URI scan failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// The location exists but is not something the catalog should hold
    #[error("not a media file: {0}")]
    NotMedia(String),

    #[error("unsupported location: {0}")]
    UnsupportedLocation(String),

    #[error("failed to read {uri}: {message}")]
    Read { uri: String, message: String },
}

impl ScanError {
    /// Whether the URI should be recorded as an ignore entry rather than an error
    pub fn is_ignorable(&self) -> bool {
        matches!(self, ScanError::NotMedia(_))
    }
}

/// Metadata scanner trait - allows swapping the tag reader in tests
pub trait MetadataScanner: Send + Sync {
    /// Read metadata for the media at `uri`
    fn scan(&self, uri: &str) -> Result<Track, ScanError>;
}

/// Reads tags from local files with lofty
#[derive(Debug, Clone, Copy, Default)]
pub struct TagScanner;

impl TagScanner {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataScanner for TagScanner {
    fn scan(&self, uri: &str) -> Result<Track, ScanError> {
        let path =
            uri_to_path(uri).ok_or_else(|| ScanError::UnsupportedLocation(uri.to_string()))?;
        scan_path(&path)
    }
}

/// Read a local file into a track
pub fn scan_path(path: &Path) -> Result<Track, ScanError> {
    let uri = path_to_uri(path);
    let read_error = |message: String| ScanError::Read {
        uri: uri.clone(),
        message,
    };

    let file_size = std::fs::metadata(path)
        .map_err(|e| read_error(e.to_string()))?
        .len();

    if !is_audio_file(path) {
        return Err(ScanError::NotMedia(uri.clone()));
    }

    let tagged_file = Probe::open(path)
        .map_err(|e| read_error(format!("Failed to open file: {}", e)))?
        .read()
        .map_err(|e| read_error(format!("Failed to read tags: {}", e)))?;

    let mut track = Track::new(uri.clone());
    track.file_size = file_size;
    track.duration_ms = tagged_file.properties().duration().as_millis() as u32;
    track.media_type = media_type(tagged_file.file_type()).map(str::to_string);

    // Prefer the format's native tag, fall back to whatever is there
    if let Some(tag) = tagged_file.primary_tag().or(tagged_file.first_tag()) {
        track.title = tag.title().map(|s| s.to_string()).unwrap_or_default();
        track.artist = tag.artist().map(|s| s.to_string()).unwrap_or_default();
        track.album = tag.album().map(|s| s.to_string()).unwrap_or_default();
        track.genre = tag.genre().map(|s| s.to_string());
        track.track_number = tag.track();
        track.disc_number = tag.disk();
        track.album_artist = tag.get_string(&ItemKey::AlbumArtist).map(str::to_string);
        track.artist_sortname = tag
            .get_string(&ItemKey::TrackArtistSortOrder)
            .map(str::to_string);
        track.album_artist_sortname = tag
            .get_string(&ItemKey::AlbumArtistSortOrder)
            .map(str::to_string);
        track.year = tag
            .get_string(&ItemKey::Year)
            .or_else(|| tag.get_string(&ItemKey::RecordingDate))
            .and_then(parse_year);
    }

    // Untagged files are still songs; use the file name as the title
    if track.title.is_empty() {
        track.title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    Ok(track)
}

/// Check if a path is an audio file based on extension
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Leading four-digit year of a date tag ("1979", "1979-11-30")
fn parse_year(value: &str) -> Option<u32> {
    let digits: String = value.trim().chars().take(4).collect();
    if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

fn media_type(file_type: FileType) -> Option<&'static str> {
    match file_type {
        FileType::Mpeg => Some("audio/mpeg"),
        FileType::Flac => Some("audio/x-flac"),
        FileType::Vorbis => Some("audio/x-vorbis"),
        FileType::Opus => Some("audio/x-opus"),
        FileType::Mp4 => Some("audio/mp4"),
        FileType::Aac => Some("audio/aac"),
        FileType::Wav => Some("audio/x-wav"),
        FileType::Aiff => Some("audio/x-aiff"),
        _ => None,
    }
}
