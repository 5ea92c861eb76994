//! Library layout patterns
//!
//! A pattern is literal text mixed with `%` markers that name a track
//! field:
//!
//! | Marker | Value |
//! |--------|-------|
//! | `%at` / `%aT` | album title (folded) |
//! | `%aa` / `%aA` | album artist (folded), falls back to the track artist |
//! | `%as` / `%aS` | album artist sort name (folded), falls back to the artist sort name |
//! | `%ay` / `%aY` | release year |
//! | `%an` / `%aN` | disc number (zero padded) |
//! | `%ag` / `%aG` | genre (folded) |
//! | `%tt` / `%tT` | track title (folded) |
//! | `%ta` / `%tA` | track artist (folded) |
//! | `%ts` / `%tS` | track artist sort name (folded) |
//! | `%tn` / `%tN` | track number (zero padded) |
//! | `%%` | a literal `%` |
//!
//! Unknown markers are kept as written.

use super::sanitize::Sanitizer;
use crate::model::{fold, Track};
use std::fmt;

/// Track fields a marker can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AlbumTitle,
    AlbumArtist,
    AlbumArtistSortname,
    Year,
    DiscNumber,
    Genre,
    TrackTitle,
    TrackArtist,
    TrackArtistSortname,
    TrackNumber,
}

/// One parsed piece of a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Text { field: Field, folded: bool },
    Number { field: Field, padded: bool },
}

/// A parsed layout pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
}

impl Pattern {
    /// Parse a pattern string; parsing never fails, unknown markers become
    /// literal text
    pub fn parse(pattern: &str) -> Self {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            let Some(category) = chars.next() else {
                literal.push('%');
                break;
            };

            if category == '%' {
                literal.push('%');
                continue;
            }

            if category != 'a' && category != 't' {
                literal.push('%');
                literal.push(category);
                continue;
            }

            let Some(letter) = chars.next() else {
                literal.push('%');
                literal.push(category);
                break;
            };

            match marker(category, letter) {
                Some(token) => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(token);
                }
                None => {
                    literal.push('%');
                    literal.push(category);
                    literal.push(letter);
                }
            }
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Self {
            source: pattern.to_string(),
            tokens,
        }
    }

    /// The pattern string this was parsed from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Substitute markers with values from `track`
    ///
    /// Text values go through `sanitizer`; literal pattern text does not,
    /// so `/` in the pattern still separates directories. An empty pattern
    /// resolves to a single space.
    pub fn resolve(&self, track: &Track, sanitizer: &Sanitizer) -> String {
        if self.tokens.is_empty() {
            return " ".to_string();
        }

        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Text { field, folded } => {
                    let value = text_value(track, *field);
                    if *folded {
                        out.push_str(&sanitizer.sanitize(&fold(value)));
                    } else {
                        out.push_str(&sanitizer.sanitize(value));
                    }
                }
                Token::Number { field, padded } => {
                    let value = number_value(track, *field);
                    if *padded {
                        out.push_str(&format!("{:02}", value));
                    } else {
                        out.push_str(&value.to_string());
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn marker(category: char, letter: char) -> Option<Token> {
    use Field::*;

    let folded = letter.is_ascii_uppercase();
    let field = match (category, letter.to_ascii_lowercase()) {
        ('a', 't') => AlbumTitle,
        ('a', 'a') => AlbumArtist,
        ('a', 's') => AlbumArtistSortname,
        ('a', 'g') => Genre,
        ('a', 'y') => return Some(Token::Number { field: Year, padded: false }),
        ('a', 'n') => return Some(Token::Number { field: DiscNumber, padded: folded }),
        ('t', 't') => TrackTitle,
        ('t', 'a') => TrackArtist,
        ('t', 's') => TrackArtistSortname,
        ('t', 'n') => return Some(Token::Number { field: TrackNumber, padded: folded }),
        _ => return None,
    };
    Some(Token::Text { field, folded })
}

fn text_value(track: &Track, field: Field) -> &str {
    match field {
        Field::AlbumTitle => &track.album,
        Field::AlbumArtist => track.effective_album_artist(),
        Field::AlbumArtistSortname => track.effective_album_artist_sortname(),
        Field::Genre => track.genre.as_deref().unwrap_or_default(),
        Field::TrackTitle => &track.title,
        Field::TrackArtist => &track.artist,
        Field::TrackArtistSortname => track.artist_sortname.as_deref().unwrap_or_default(),
        Field::Year | Field::DiscNumber | Field::TrackNumber => "",
    }
}

fn number_value(track: &Track, field: Field) -> u32 {
    match field {
        Field::Year => track.year,
        Field::DiscNumber => track.disc_number,
        Field::TrackNumber => track.track_number,
        _ => None,
    }
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> Track {
        Track {
            title: "Another Brick in the Wall, Part 2".to_string(),
            artist: "Pink Floyd".to_string(),
            artist_sortname: Some("Floyd, Pink".to_string()),
            album: "The Wall".to_string(),
            album_artist: Some("Pink Floyd".to_string()),
            genre: Some("Progressive Rock".to_string()),
            year: Some(1979),
            disc_number: Some(1),
            track_number: Some(5),
            ..Track::new("file:///music/wall/05.ogg")
        }
    }

    fn resolve(pattern: &str, track: &Track) -> String {
        Pattern::parse(pattern).resolve(track, &Sanitizer::default())
    }

    #[test]
    fn test_album_layout() {
        assert_eq!(resolve("%aa/%at", &wall()), "Pink Floyd/The Wall");
    }

    #[test]
    fn test_strict_album_artist_separator() {
        let mut track = wall();
        track.album_artist = Some("AC/DC".to_string());
        track.album = "Back in Black".to_string();
        let resolved = Pattern::parse("%aa/%at").resolve(&track, &Sanitizer::new(true));
        assert_eq!(resolved, "AC-DC/Back_in_Black");
    }

    #[test]
    fn test_literal_only() {
        for text in ["plain", "a/b/c", "Music - Mixed", "100 percent", " "] {
            assert_eq!(resolve(text, &wall()), text);
        }
    }

    #[test]
    fn test_escaped_percent() {
        assert_eq!(resolve("%%", &wall()), "%");
        assert_eq!(resolve("100%%", &wall()), "100%");
        assert_eq!(resolve("%%at", &wall()), "%at");
        assert_eq!(resolve("x%%%tn", &wall()), "x%5");
    }

    #[test]
    fn test_empty_pattern_is_a_space() {
        assert_eq!(resolve("", &wall()), " ");
    }

    #[test]
    fn test_unknown_markers_pass_through() {
        assert_eq!(resolve("%ax-%tz-%q", &wall()), "%ax-%tz-%q");
        assert_eq!(resolve("end%", &wall()), "end%");
        assert_eq!(resolve("end%t", &wall()), "end%t");
    }

    #[test]
    fn test_numbers() {
        let mut track = wall();
        assert_eq!(resolve("%tn %tN %an %aN %ay", &track), "5 05 1 01 1979");

        track.track_number = Some(12);
        assert_eq!(resolve("%tN", &track), "12");

        track.track_number = None;
        track.year = None;
        assert_eq!(resolve("%tN %ay", &track), "00 0");
    }

    #[test]
    fn test_padded_numbers_have_two_digits() {
        let mut track = wall();
        for n in 0..100 {
            track.track_number = Some(n);
            track.disc_number = Some(n);
            let resolved = resolve("%tN|%aN", &track);
            let (t, d) = resolved.split_once('|').unwrap();
            assert_eq!(t.len(), 2);
            assert_eq!(d.len(), 2);
            assert_eq!(t.parse::<u32>().unwrap(), n);
        }
    }

    #[test]
    fn test_folded_variants() {
        assert_eq!(
            resolve("%aA/%aT/%tT/%tA/%aG", &wall()),
            "pink floyd/the wall/another brick in the wall, part 2/pink floyd/progressive rock"
        );
        assert_eq!(resolve("%aY", &wall()), "1979");
    }

    #[test]
    fn test_album_artist_falls_back_to_artist() {
        let mut track = wall();
        track.album_artist = None;
        track.artist = "Roger Waters".to_string();
        assert_eq!(resolve("%aa", &track), "Roger Waters");

        track.album_artist = Some(String::new());
        assert_eq!(resolve("%aa", &track), "Roger Waters");
        assert_eq!(resolve("%as", &track), "Floyd, Pink");
    }

    #[test]
    fn test_values_are_sanitized_but_literals_are_not() {
        let mut track = wall();
        track.title = ".hidden/track".to_string();
        assert_eq!(resolve("./%tt", &track), "./hidden-track");
    }

    #[test]
    fn test_tokens() {
        let pattern = Pattern::parse("%tN - %tt");
        assert_eq!(
            pattern.tokens(),
            &[
                Token::Number { field: Field::TrackNumber, padded: true },
                Token::Literal(" - ".to_string()),
                Token::Text { field: Field::TrackTitle, folded: false },
            ]
        );
        assert_eq!(pattern.to_string(), "%tN - %tt");
    }
}
