//! Attachment identifiers.
//!
//! An attachment is identified by its filename. Only filenames that follow
//! the archive naming convention `example_<message>_attachment_<n>.<ext>`
//! are treated as real candidates; everything else (inline logos, tracking
//! pixels, boilerplate images) is ignored during extraction.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Opaque identifier of one candidate attachment within a message.
///
/// Equality is exact, case-sensitive string equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(String);

impl AttachmentId {
    /// Wrap a filename as-is.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Build an id from a raw header filename, keeping it only if it follows
    /// the naming convention.
    ///
    /// A single layer of surrounding quote characters is stripped first.
    pub fn from_header_filename(raw: &str) -> Option<Self> {
        let name = strip_quotes(raw.trim());
        if matches_convention(name) {
            Some(Self(name.to_string()))
        } else {
            None
        }
    }

    /// The filename as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttachmentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for AttachmentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether a filename follows `example_<digits>_attachment_<digits>.<ext>`.
pub fn matches_convention(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^example_\d+_attachment_\d+\.[^.\s]+").expect("valid attachment pattern")
        })
        .is_match(name)
}

/// Strip one leading and one trailing quote character (`"` or `'`), if present.
fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix(['"', '\'']).unwrap_or(s);
    s.strip_suffix(['"', '\'']).unwrap_or(s)
}
