//! Plain-text excerpt extraction with a character budget.
//!
//! Works on the raw generated text, independently of the block tree. Lines
//! are cleaned of markup, accumulated into paragraphs, and appended whole
//! while they fit the budget; the tail is trimmed to a sentence boundary
//! where one lands close enough to the budget.

use std::sync::LazyLock;

use regex::Regex;

/// Default excerpt character budget.
pub const DEFAULT_MAX_CHARS: usize = 500;

/// Once the running excerpt is at least this long, an overflowing paragraph
/// is dropped rather than partially appended.
const MIN_CHARS_BEFORE_STOP: usize = 100;

/// Sentence-boundary trimming applies when the result ends within this many
/// characters of the budget.
const NEAR_BUDGET_WINDOW: usize = 10;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+").expect("valid regex"));
static QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:>\s*)+").expect("valid regex"));
static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*]|\d+\.)\s+").expect("valid regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").expect("valid regex"));
static BOLD_STAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));
static BOLD_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__([^_]+)__").expect("valid regex"));
static ITALIC_STAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("valid regex"));
static ITALIC_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_([^_]+)_").expect("valid regex"));
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));

/// Derive a plain-text excerpt of at most `max_chars` characters.
///
/// Whole cleaned paragraphs are appended while they fit; an overflowing
/// paragraph is partially appended only while the result is still short.
/// When the result lands within [`NEAR_BUDGET_WINDOW`] of the budget it is
/// cut back to the last sentence boundary past the 60%-of-budget mark, or
/// hard-truncated with an ellipsis when no boundary exists.
pub fn extract_excerpt(text: &str, max_chars: usize) -> String {
    let mut out = String::new();
    let mut out_chars = 0usize;

    for para in paragraphs(text) {
        let para_chars = para.chars().count();
        let sep = usize::from(!out.is_empty());

        if out_chars + sep + para_chars <= max_chars {
            if sep == 1 {
                out.push(' ');
            }
            out.push_str(&para);
            out_chars += sep + para_chars;
            continue;
        }

        if out_chars >= MIN_CHARS_BEFORE_STOP {
            break;
        }

        // Still short: take as much of the overflowing paragraph as fits.
        let room = max_chars.saturating_sub(out_chars + sep);
        if room == 0 {
            break;
        }
        if sep == 1 {
            out.push(' ');
        }
        out.extend(para.chars().take(room));
        out_chars += sep + room;
        break;
    }

    if out_chars + NEAR_BUDGET_WINDOW >= max_chars {
        out = trim_to_sentence(&out, max_chars);
    }
    out
}

/// Clean markup off lines and group non-blank runs into paragraphs.
fn paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in text.lines() {
        match clean_line(line) {
            Some(cleaned) => current.push(cleaned),
            None => {
                if !current.is_empty() {
                    paragraphs.push(current.join(" "));
                    current.clear();
                }
            }
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }
    paragraphs
}

/// Strip block and inline markup from one line. `None` marks a paragraph
/// break (blank line or dropped horizontal rule).
fn clean_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || matches!(trimmed, "---" | "***" | "___") {
        return None;
    }

    let stripped = HEADING_RE.replace(trimmed, "");
    let stripped = QUOTE_RE.replace(&stripped, "");
    let stripped = LIST_MARKER_RE.replace(&stripped, "");
    let stripped = LINK_RE.replace_all(&stripped, "$1");
    let stripped = BOLD_STAR_RE.replace_all(&stripped, "$1");
    let stripped = BOLD_UNDERSCORE_RE.replace_all(&stripped, "$1");
    let stripped = ITALIC_STAR_RE.replace_all(&stripped, "$1");
    let stripped = ITALIC_UNDERSCORE_RE.replace_all(&stripped, "$1");
    let stripped = CODE_RE.replace_all(&stripped, "$1");

    let cleaned = stripped.trim().to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Cut `text` back to the last `". "` past the 60%-of-budget mark, keeping
/// the period. Without one, hard-truncate to `max_chars - 3` characters and
/// append an ellipsis.
fn trim_to_sentence(text: &str, max_chars: usize) -> String {
    let scan_from = byte_index_at_char(text, max_chars * 3 / 5);
    if let Some(rel) = text[scan_from..].rfind(". ") {
        return text[..scan_from + rel + 1].to_string();
    }

    let mut truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

/// Byte offset of the `char_idx`-th character, or the end of the string.
fn byte_index_at_char(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> usize {
        s.chars().count()
    }

    #[test]
    fn short_text_passes_through() {
        let excerpt = extract_excerpt("A short body.", 500);
        assert_eq!(excerpt, "A short body.");
    }

    #[test]
    fn markup_is_stripped() {
        let text = "# Heading\n\nSome **bold** and *italic* and `code` here.\n\n\
                    > quoted wisdom\n\n- first item\n1. numbered item\n\n\
                    See [the guide](https://example.com/guide).";
        let excerpt = extract_excerpt(text, 500);
        assert_eq!(
            excerpt,
            "Heading Some bold and italic and code here. quoted wisdom \
             first item numbered item See the guide."
        );
    }

    #[test]
    fn horizontal_rules_are_dropped() {
        let excerpt = extract_excerpt("before\n---\nafter", 500);
        assert_eq!(excerpt, "before after");
    }

    #[test]
    fn multi_line_paragraph_joined_with_spaces() {
        let excerpt = extract_excerpt("line one\nline two\n\nline three", 500);
        assert_eq!(excerpt, "line one line two line three");
    }

    #[test]
    fn length_never_exceeds_budget() {
        let long = "An ordinary sentence about nothing in particular. ".repeat(40);
        for max in [50, 100, 200, 500, 503] {
            let excerpt = extract_excerpt(&long, max);
            assert!(
                chars(&excerpt) <= max,
                "budget {max} exceeded: {}",
                chars(&excerpt)
            );
        }
    }

    #[test]
    fn overflowing_paragraph_dropped_once_past_minimum() {
        // First paragraph comfortably past the 100-char minimum; the second
        // would overflow the budget and must be dropped entirely.
        let first = "x".repeat(150);
        let second = "y".repeat(400);
        let excerpt = extract_excerpt(&format!("{first}\n\n{second}"), 500);
        assert_eq!(excerpt, first);
    }

    #[test]
    fn overflowing_paragraph_partially_taken_while_short() {
        // First paragraph under the minimum, so the overflow paragraph is
        // cut to fit instead of dropped.
        let first = "x".repeat(50);
        let second = "y".repeat(600);
        let excerpt = extract_excerpt(&format!("{first}\n\n{second}"), 500);
        assert_eq!(chars(&excerpt), 500);
        assert!(excerpt.starts_with(&first));
    }

    #[test]
    fn near_budget_result_ends_at_sentence_boundary() {
        let text = "A first sentence of reasonable length. A second sentence follows it. "
            .repeat(10);
        let excerpt = extract_excerpt(&text, 500);
        assert!(chars(&excerpt) <= 500);
        assert!(
            excerpt.ends_with('.'),
            "expected sentence-boundary cut, got: ...{}",
            &excerpt[excerpt.len().saturating_sub(20)..]
        );
    }

    #[test]
    fn no_sentence_boundary_hard_truncates_with_ellipsis() {
        let text = "z".repeat(1000);
        let excerpt = extract_excerpt(&text, 500);
        assert_eq!(chars(&excerpt), 500);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn empty_input_yields_empty_excerpt() {
        assert_eq!(extract_excerpt("", 500), "");
        assert_eq!(extract_excerpt("\n\n\n", 500), "");
    }

    #[test]
    fn multibyte_text_respects_char_budget() {
        let text = "ä".repeat(600);
        let excerpt = extract_excerpt(&text, 500);
        assert_eq!(chars(&excerpt), 500);
    }
}
