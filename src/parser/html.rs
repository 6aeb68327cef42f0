//! Canonical form of an HTML body for inclusion in a model prompt.

use std::sync::OnceLock;

use regex::Regex;

/// Default cap on normalized body length, in characters.
pub const MAX_BODY_CHARS: usize = 200_000;

/// Appended when a body is cut at the length cap.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Normalize a body with the default length cap.
pub fn normalize(body: &str) -> String {
    normalize_with_limit(body, MAX_BODY_CHARS)
}

/// Normalize an HTML body.
///
/// - Decodes character entities (unknown entities are left untouched)
/// - Collapses every whitespace run to one space
/// - Removes whitespace sitting between `>` and `<`
/// - Trims both ends
/// - Cuts at `max_chars` characters, appending [`TRUNCATION_MARKER`]
pub fn normalize_with_limit(body: &str, max_chars: usize) -> String {
    if body.is_empty() {
        return String::new();
    }

    let text = unescape_entities(body);
    let text = whitespace_re().replace_all(&text, " ");
    let text = between_tags_re().replace_all(&text, "><");
    let text = text.trim();

    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Decode character references the way an HTML5 parser does in text.
///
/// Covers the full named table, legacy names without a trailing `;`,
/// decimal and hex references, and the Windows-1252 remapping of
/// `&#128;`..`&#159;`. Unknown names are left untouched; `&#0;`, surrogates
/// and out-of-range code points become U+FFFD.
pub fn unescape_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    htmlize::unescape(input).into_owned()
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

fn between_tags_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r">\s+<").expect("valid tag-gap pattern"))
}
