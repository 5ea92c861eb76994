//! Internal Rhythmbox data structures for XML parsing

use crate::model::Track;
use chrono::Datelike;

/// Rhythmbox track entry (as stored in rhythmdb.xml)
#[derive(Debug, Clone, Default)]
pub struct RhythmboxEntry {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub artist_sortname: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub album_artist_sortname: Option<String>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub duration: Option<u32>, // seconds
    pub file_size: Option<u64>,
    pub location: Option<String>, // file:// URI
    pub date: Option<u32>, // julian day
    pub media_type: Option<String>,
}

impl RhythmboxEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release year from the julian day number rhythmdb stores
    pub fn year(&self) -> Option<u32> {
        let days = i32::try_from(self.date?).ok()?;
        if days == 0 {
            return None;
        }
        let date = chrono::NaiveDate::from_num_days_from_ce_opt(days)?;
        u32::try_from(date.year()).ok()
    }

    /// Convert to our unified Track model; needs at least a location
    pub fn into_track(self) -> Option<Track> {
        let location = self.location.clone()?;
        let year = self.year();

        Some(Track {
            title: self.title.unwrap_or_default(),
            artist: self.artist.unwrap_or_default(),
            artist_sortname: self.artist_sortname,
            album: self.album.unwrap_or_default(),
            album_artist: self.album_artist,
            album_artist_sortname: self.album_artist_sortname,
            genre: self.genre,
            year,
            disc_number: self.disc_number,
            track_number: self.track_number,
            duration_ms: self.duration.unwrap_or(0).saturating_mul(1000), // Convert seconds to ms
            file_size: self.file_size.unwrap_or(0),
            media_type: self.media_type,
            ..Track::new(location)
        })
    }
}
