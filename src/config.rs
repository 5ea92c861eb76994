//! Library configuration

use std::time::Duration;

/// Default directory layout (Artist/Album)
pub const DEFAULT_LAYOUT_PATH: &str = "%aa/%at";

/// Default filename layout (Number - Title)
pub const DEFAULT_LAYOUT_FILENAME: &str = "%tN - %tt";

/// Default encoding profile
pub const DEFAULT_PREFERRED_FORMAT: &str = "audio/x-vorbis";

/// Delay before a pending import job starts, so more URIs can join it
pub const DEFAULT_IMPORT_DELAY: Duration = Duration::from_millis(250);

/// Settings that drive the library layout and import behaviour
#[derive(Debug, Clone, PartialEq)]
pub struct LibrarySettings {
    /// Library root locations (URIs); new files go into the first one
    pub locations: Vec<String>,

    /// Directory layout pattern, e.g. `%aa/%at`
    pub layout_path: Option<String>,

    /// Filename layout pattern, e.g. `%tN - %tt`
    pub layout_filename: Option<String>,

    /// Replace shell metacharacters and whitespace in path segments
    pub strip_chars: bool,

    /// Preferred encoding profile (media type)
    pub preferred_format: Option<String>,

    /// Debounce window for coalescing import requests
    pub import_delay: Duration,

    /// Maximum concurrent metadata scans per import job
    pub scan_concurrency: usize,
}

/// Identifies a setting in change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Locations,
    LayoutPath,
    LayoutFilename,
    StripChars,
    PreferredFormat,
    ImportDelay,
    ScanConcurrency,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            layout_path: Some(DEFAULT_LAYOUT_PATH.to_string()),
            layout_filename: Some(DEFAULT_LAYOUT_FILENAME.to_string()),
            strip_chars: false,
            preferred_format: Some(DEFAULT_PREFERRED_FORMAT.to_string()),
            import_delay: DEFAULT_IMPORT_DELAY,
            scan_concurrency: 4,
        }
    }
}

impl LibrarySettings {
    /// Create settings with a single library location
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            locations: vec![location.into()],
            ..Self::default()
        }
    }

    /// Add another library location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.locations.push(location.into());
        self
    }

    /// Set the directory layout pattern
    pub fn with_layout_path(mut self, pattern: impl Into<String>) -> Self {
        self.layout_path = Some(pattern.into());
        self
    }

    /// Set the filename layout pattern
    pub fn with_layout_filename(mut self, pattern: impl Into<String>) -> Self {
        self.layout_filename = Some(pattern.into());
        self
    }

    /// Enable or disable strict character stripping
    pub fn with_strip_chars(mut self, strip: bool) -> Self {
        self.strip_chars = strip;
        self
    }

    /// Set the preferred encoding profile
    pub fn with_preferred_format(mut self, format: impl Into<String>) -> Self {
        self.preferred_format = Some(format.into());
        self
    }

    /// Set the import debounce window
    pub fn with_import_delay(mut self, delay: Duration) -> Self {
        self.import_delay = delay;
        self
    }

    /// Set the per-job scan concurrency (at least 1)
    pub fn with_scan_concurrency(mut self, n: usize) -> Self {
        self.scan_concurrency = n.max(1);
        self
    }

    /// Keys whose values differ between `self` and `other`
    pub fn changed_keys(&self, other: &LibrarySettings) -> Vec<SettingKey> {
        let mut keys = Vec::new();
        if self.locations != other.locations {
            keys.push(SettingKey::Locations);
        }
        if self.layout_path != other.layout_path {
            keys.push(SettingKey::LayoutPath);
        }
        if self.layout_filename != other.layout_filename {
            keys.push(SettingKey::LayoutFilename);
        }
        if self.strip_chars != other.strip_chars {
            keys.push(SettingKey::StripChars);
        }
        if self.preferred_format != other.preferred_format {
            keys.push(SettingKey::PreferredFormat);
        }
        if self.import_delay != other.import_delay {
            keys.push(SettingKey::ImportDelay);
        }
        if self.scan_concurrency != other.scan_concurrency {
            keys.push(SettingKey::ScanConcurrency);
        }
        keys
    }
}

/// File extension for an encoding profile
pub fn extension_for_format(format: &str) -> Option<&'static str> {
    match format {
        "audio/x-vorbis" | "audio/ogg" => Some("ogg"),
        "audio/mpeg" => Some("mp3"),
        "audio/x-flac" | "audio/flac" => Some("flac"),
        "audio/x-aac" | "audio/mp4" => Some("m4a"),
        "audio/x-opus" | "audio/opus" => Some("opus"),
        "audio/x-wav" | "audio/wav" => Some("wav"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = LibrarySettings::default();
        assert!(settings.locations.is_empty());
        assert_eq!(settings.layout_path.as_deref(), Some("%aa/%at"));
        assert_eq!(settings.layout_filename.as_deref(), Some("%tN - %tt"));
        assert!(!settings.strip_chars);
        assert_eq!(settings.import_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_changed_keys() {
        let a = LibrarySettings::new("file:///music");
        let b = a.clone().with_strip_chars(true).with_layout_path("%at");
        assert_eq!(
            a.changed_keys(&b),
            vec![SettingKey::LayoutPath, SettingKey::StripChars]
        );
        assert!(a.changed_keys(&a).is_empty());
    }

    #[test]
    fn test_extension_for_format() {
        assert_eq!(extension_for_format("audio/x-vorbis"), Some("ogg"));
        assert_eq!(extension_for_format("audio/mpeg"), Some("mp3"));
        assert_eq!(extension_for_format("video/x-matroska"), None);
    }
}
