//! Library file layout
//!
//! Maps track metadata to a destination inside the library: the first
//! library location, then the resolved path pattern, then the resolved
//! filename pattern plus an extension.

pub mod pattern;
pub mod sanitize;

pub use pattern::{Field, Pattern, Token};
pub use sanitize::Sanitizer;

use crate::config::LibrarySettings;
use crate::model::Track;
use thiserror::Error;

/// Built-in directory layouts (title, pattern)
pub const LAYOUT_PATHS: &[(&str, &str)] = &[
    ("Artist/Artist - Album", "%aa/%aa - %at"),
    ("Artist/Album", "%aa/%at"),
    ("Artist - Album", "%aa - %at"),
    ("Album", "%at"),
    ("Artist", "%aa"),
];

/// Built-in filename layouts (title, pattern)
pub const LAYOUT_FILENAMES: &[(&str, &str)] = &[
    ("Number - Title", "%tN - %tt"),
    ("Artist - Title", "%ta - %tt"),
    ("Artist - Number - Title", "%ta - %tN - %tt"),
    ("Artist (Album) - Number - Title", "%ta (%at) - %tN - %tt"),
    ("Title", "%tt"),
    ("Number. Artist - Title", "%tN. %ta - %tt"),
];

/// Reasons a library layout cannot be built from settings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("no library location configured")]
    NoLocation,

    #[error("library layout path pattern not set")]
    MissingPathPattern,

    #[error("library layout filename pattern not set")]
    MissingFilenamePattern,

    #[error("preferred encoding format not set")]
    MissingFormat,
}

/// A complete, validated library layout
#[derive(Debug, Clone)]
pub struct LibraryLayout {
    location: String,
    path: Pattern,
    filename: Pattern,
    sanitizer: Sanitizer,
    preferred_format: String,
}

impl LibraryLayout {
    /// Build a layout, failing if any required setting is missing
    pub fn from_settings(settings: &LibrarySettings) -> Result<Self, LayoutError> {
        let location = settings.locations.first().ok_or(LayoutError::NoLocation)?;
        let path = settings
            .layout_path
            .as_deref()
            .ok_or(LayoutError::MissingPathPattern)?;
        let filename = settings
            .layout_filename
            .as_deref()
            .ok_or(LayoutError::MissingFilenamePattern)?;
        let preferred_format = settings
            .preferred_format
            .clone()
            .ok_or(LayoutError::MissingFormat)?;

        let sanitizer = Sanitizer::new(settings.strip_chars);

        Ok(Self {
            location: location.trim_end_matches('/').to_string(),
            path: Pattern::parse(path),
            filename: Pattern::parse(&sanitizer.sanitize_pattern(filename)),
            sanitizer,
            preferred_format,
        })
    }

    /// Library root that new files go into
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn preferred_format(&self) -> &str {
        &self.preferred_format
    }

    /// Path relative to the library root, `/`-separated
    pub fn relative_path(&self, track: &Track, extension: Option<&str>) -> String {
        let dir = self.path.resolve(track, &self.sanitizer);
        let mut file = self.filename.resolve(track, &self.sanitizer);
        if let Some(ext) = extension {
            file.push('.');
            file.push_str(ext);
        }

        dir.split('/')
            .chain(file.split('/'))
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Destination URI for a track under the first library location
    ///
    /// Returns `None` if the layout resolves to nothing usable.
    pub fn destination_uri(&self, track: &Track, extension: Option<&str>) -> Option<String> {
        let relative = self.relative_path(track, extension);
        let mut segments = Vec::new();
        for segment in relative.split('/') {
            match segment {
                "." => {}
                ".." => {
                    segments.pop()?;
                }
                s => segments.push(urlencoding::encode(s).into_owned()),
            }
        }
        if segments.is_empty() {
            return None;
        }

        Some(format!("{}/{}", self.location, segments.join("/")))
    }

    /// Example path for the layout, as shown when choosing one
    pub fn example_path(&self) -> String {
        let ext = crate::config::extension_for_format(&self.preferred_format).unwrap_or("ogg");
        format!("/{}", self.relative_path(&Track::example(), Some(ext)))
    }
}
