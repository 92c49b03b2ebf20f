//! Topic derivation for pub/sub routing.
//!
//! A topic is the ancestor topic followed by `.` and a normalised local key.
//! Local keys keep Unicode letters, combining marks and digits; every other
//! run of characters collapses into a single `_`.

use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Separator between hierarchy levels.
pub const LEVEL_SEPARATOR: char = '.';

/// Maximum length of the university segment, in graphemes.
pub const UNIVERSITY_SEGMENT_LIMIT: usize = 25;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{M}\p{N}]+").expect("valid topic pattern"));

/// Normalise one local key into a topic segment.
pub fn segment(key: &str) -> String {
    NON_ALNUM.replace_all(key, "_").trim_matches('_').to_string()
}

/// Topic of a university, truncated to [`UNIVERSITY_SEGMENT_LIMIT`].
pub fn university_topic(name: &str) -> String {
    let segment = segment(name);
    segment
        .graphemes(true)
        .take(UNIVERSITY_SEGMENT_LIMIT)
        .collect::<String>()
        .trim_end_matches('_')
        .to_string()
}

/// Append a child key to a parent topic.
pub fn child_topic(parent: &str, key_parts: &[&str]) -> String {
    let local = segment(&key_parts.join(" "));
    if parent.is_empty() {
        local
    } else {
        format!("{parent}{LEVEL_SEPARATOR}{local}")
    }
}
