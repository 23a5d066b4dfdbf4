//! URL-safe slug derivation for document titles.
//!
//! Lowercase, strip characters that are not word characters, whitespace, or
//! hyphens, collapse whitespace runs into single hyphens, trim hyphens, cap
//! the base at 100 characters, then append a millisecond timestamp so
//! repeated generations of the same title never collide.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

/// Maximum length of the slug base, before the uniqueness suffix.
const MAX_BASE_CHARS: usize = 100;

static STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]+").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Derive a unique, URL-safe slug from a title.
pub fn derive_slug(title: &str) -> String {
    format!("{}-{}", slug_base(title), Utc::now().timestamp_millis())
}

/// The deterministic part of the slug, without the uniqueness suffix.
pub(crate) fn slug_base(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = STRIP_RE.replace_all(&lowered, "");
    let hyphenated = WHITESPACE_RE.replace_all(stripped.trim(), "-");

    let base: String = hyphenated
        .trim_matches('-')
        .chars()
        .take(MAX_BASE_CHARS)
        .collect();
    base.trim_end_matches('-').to_string()
}
