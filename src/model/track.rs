use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Represents a single music track with all its metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique identifier for this track (md5 of the location)
    pub id: String,

    /// Location URI (file://, smb://, ...)
    pub location: String,

    /// Track title
    pub title: String,

    /// Track artist
    pub artist: String,

    /// Artist sort name (e.g. "Beatles, The")
    pub artist_sortname: Option<String>,

    /// Album title
    pub album: String,

    /// Album artist, if different from the track artist
    pub album_artist: Option<String>,

    /// Album artist sort name
    pub album_artist_sortname: Option<String>,

    /// Genre (optional)
    pub genre: Option<String>,

    /// Release year (optional)
    pub year: Option<u32>,

    /// Disc number in a multi-disc release (optional)
    pub disc_number: Option<u32>,

    /// Track number in album (optional)
    pub track_number: Option<u32>,

    /// Track duration in milliseconds
    pub duration_ms: u32,

    /// File size in bytes
    pub file_size: u64,

    /// Media type, e.g. "audio/mpeg"
    pub media_type: Option<String>,
}

impl Track {
    /// Create a track for a location with a stable id derived from it
    pub fn new(location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            id: track_id(&location),
            location,
            ..Self::default()
        }
    }

    /// Sample track used to preview a library layout
    pub fn example() -> Self {
        Self {
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            artist_sortname: Some("Artist".to_string()),
            album: "Album".to_string(),
            genre: Some("Genre".to_string()),
            year: Some(2011),
            disc_number: Some(1),
            track_number: Some(7),
            ..Self::new("file:///example.ogg")
        }
    }

    /// Album artist, falling back to the track artist when unset or empty
    pub fn effective_album_artist(&self) -> &str {
        match self.album_artist.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => &self.artist,
        }
    }

    /// Album artist sort name, falling back to the artist sort name
    pub fn effective_album_artist_sortname(&self) -> &str {
        match self.album_artist_sortname.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => self.artist_sortname.as_deref().unwrap_or_default(),
        }
    }

    /// Local filesystem path for file:// locations
    pub fn file_path(&self) -> Option<PathBuf> {
        uri_to_path(&self.location)
    }

    /// Lowercase file extension of the location, if any
    pub fn extension(&self) -> Option<String> {
        let name = self.location.rsplit('/').next()?;
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_lowercase())
        }
    }
}

/// Generate a stable track id from its location
pub fn track_id(location: &str) -> String {
    format!("{:x}", md5::compute(location.as_bytes()))
}

/// Case-folded form of a metadata string
pub fn fold(s: &str) -> String {
    s.to_lowercase()
}

/// Convert a file:// URI to a local path
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    // Remove file:// prefix and decode URL encoding
    let path = uri.strip_prefix("file://")?;
    let decoded = urlencoding::decode(path).ok()?;
    Some(PathBuf::from(decoded.into_owned()))
}

/// Convert an absolute local path to a file:// URI
pub fn path_to_uri(path: &std::path::Path) -> String {
    let encoded: Vec<String> = path
        .to_string_lossy()
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("file://{}", encoded.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_artist_fallback() {
        let mut track = Track::new("file:///music/a.mp3");
        track.artist = "Queen".to_string();
        assert_eq!(track.effective_album_artist(), "Queen");

        track.album_artist = Some(String::new());
        assert_eq!(track.effective_album_artist(), "Queen");

        track.album_artist = Some("Various Artists".to_string());
        assert_eq!(track.effective_album_artist(), "Various Artists");
    }

    #[test]
    fn test_uri_round_trip() {
        let path = PathBuf::from("/music/Pink Floyd/01 - In the Flesh?.ogg");
        let uri = path_to_uri(&path);
        assert_eq!(uri, "file:///music/Pink%20Floyd/01%20-%20In%20the%20Flesh%3F.ogg");
        assert_eq!(uri_to_path(&uri), Some(path));
    }

    #[test]
    fn test_extension() {
        assert_eq!(Track::new("file:///a/b.FLAC").extension().as_deref(), Some("flac"));
        assert_eq!(Track::new("file:///a.b/c").extension(), None);
    }
}
