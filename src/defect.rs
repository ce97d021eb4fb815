//! The defect signature and the byte-level search primitives behind it.
//!
//! Projects exported for iOS on Windows end up with a shell script phase that
//! references `MapFileParser.sh\""`: the trailing escaped quote is followed by
//! one quote too many, and Xcode refuses to open the project. The signature
//! picks the broken line; the edit marker picks the character to drop.

/// A line-level defect: which lines are broken, and where to cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefectSignature {
    pattern: &'static str,
    marker: &'static str,
}

impl DefectSignature {
    /// The `MapFileParser.sh\""` defect written by the Windows iOS exporter.
    pub const MAP_FILE_PARSER: DefectSignature = DefectSignature {
        pattern: "MapFileParser.sh\\\"\"",
        marker: "\"\"",
    };

    /// Create a signature with a custom pattern and edit marker.
    ///
    /// The first character of `marker` is the one removed from a matching line.
    pub const fn new(pattern: &'static str, marker: &'static str) -> Self {
        Self { pattern, marker }
    }

    pub fn pattern(&self) -> &'static str {
        self.pattern
    }

    pub fn marker(&self) -> &'static str {
        self.marker
    }

    /// Byte offset of the signature within `line`, if present.
    pub fn find_pattern(&self, line: &[u8]) -> Option<usize> {
        find_subslice(line, self.pattern.as_bytes())
    }

    /// Byte offset of the first edit marker within `line`, if present.
    pub fn find_marker(&self, line: &[u8]) -> Option<usize> {
        find_subslice(line, self.marker.as_bytes())
    }

    /// Byte offset of the first edit marker in `line`, with the character
    /// removed there.
    pub fn find_edit(&self, line: &[u8]) -> Option<(usize, char)> {
        let offset = self.find_marker(line)?;
        let removed = self.marker.chars().next()?;
        Some((offset, removed))
    }
}

impl Default for DefectSignature {
    fn default() -> Self {
        Self::MAP_FILE_PARSER
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
