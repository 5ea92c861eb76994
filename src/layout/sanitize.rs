//! Path segment sanitization
//!
//! Substituted metadata values end up as directory and file names, so
//! they must not contain separators or start with a dot. Strict mode also
//! makes the result shell-friendly.

/// Characters replaced with `-` in strict mode
const STRICT_SEPARATORS: &[char] = &['\\', ':', '|'];

/// Shell metacharacters replaced with whitespace in strict mode
const SHELL_METACHARS: &[char] = &[
    '*', '?', '&', '!', '\'', '"', '$', '(', ')', '`', '>', '<', '{', '}',
];

/// Sanitizes resolved strings into single path segments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sanitizer {
    strict: bool,
}

impl Sanitizer {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Turn a metadata value into one safe path segment
    pub fn sanitize(&self, value: &str) -> String {
        let trimmed = value.trim_start_matches('.');

        let mut out = String::with_capacity(trimmed.len());
        let mut in_whitespace = false;
        for c in trimmed.chars() {
            let c = match c {
                '/' => '-',
                c if self.strict && STRICT_SEPARATORS.contains(&c) => '-',
                c if self.strict && SHELL_METACHARS.contains(&c) => ' ',
                c => c,
            };

            if self.strict && c.is_whitespace() {
                if !in_whitespace {
                    out.push('_');
                }
                in_whitespace = true;
            } else {
                out.push(c);
                in_whitespace = false;
            }
        }
        out
    }

    /// Prepare a filename pattern: strict mode turns whitespace into `_`
    pub fn sanitize_pattern(&self, pattern: &str) -> String {
        if self.strict {
            pattern
                .chars()
                .map(|c| if c == ' ' || c == '\t' { '_' } else { c })
                .collect()
        } else {
            pattern.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_dots_stripped() {
        let s = Sanitizer::new(false);
        assert_eq!(s.sanitize("...And Justice for All"), "And Justice for All");
        assert_eq!(s.sanitize("Mr. Bungle"), "Mr. Bungle");
    }

    #[test]
    fn test_separator_replaced() {
        assert_eq!(Sanitizer::new(false).sanitize("AC/DC"), "AC-DC");
        assert_eq!(Sanitizer::new(true).sanitize("AC/DC"), "AC-DC");
    }

    #[test]
    fn test_normal_mode_keeps_other_characters() {
        let s = Sanitizer::new(false);
        assert_eq!(s.sanitize("What's Up? (Live)"), "What's Up? (Live)");
        assert_eq!(s.sanitize("a\\b:c|d"), "a\\b:c|d");
    }

    #[test]
    fn test_strict_mode() {
        let s = Sanitizer::new(true);
        assert_eq!(s.sanitize("a\\b:c|d"), "a-b-c-d");
        assert_eq!(s.sanitize("What's Up? (Live)"), "What_s_Up_Live_");
        assert_eq!(s.sanitize("Rock & Roll"), "Rock_Roll");
        assert_eq!(s.sanitize("tab\there"), "tab_here");
        assert_eq!(s.sanitize("<{$HOME}>"), "_HOME_");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "..hidden",
            "AC/DC",
            "What's Up? (Live)",
            " . leading space",
            "./.x",
            "a  \t b",
            "$.dot",
            "",
        ];
        for strict in [false, true] {
            let s = Sanitizer::new(strict);
            for input in inputs {
                let once = s.sanitize(input);
                assert_eq!(s.sanitize(&once), once, "strict={} input={:?}", strict, input);
            }
        }
    }

    #[test]
    fn test_sanitize_pattern() {
        assert_eq!(Sanitizer::new(true).sanitize_pattern("%tN - %tt"), "%tN_-_%tt");
        assert_eq!(Sanitizer::new(false).sanitize_pattern("%tN - %tt"), "%tN - %tt");
    }
}
