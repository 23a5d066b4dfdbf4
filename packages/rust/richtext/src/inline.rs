//! Inline span tokenizer for a single line of text.
//!
//! An explicit cursor walks the line left to right. At each position the
//! structured patterns are tried in a fixed priority order — bold, italic,
//! link — and whatever matches first wins. A special character that opens no
//! structured run is emitted as a one-character plain span, so malformed
//! markup degrades to plain text instead of failing.

use serde::{Deserialize, Serialize};

/// One formatted run of text within a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSpan {
    /// Visible text of the span, with formatting markers stripped.
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    /// Target URL when the span is a link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl InlineSpan {
    /// A plain, unformatted span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            link: None,
        }
    }

    /// A bold span.
    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::plain(text)
        }
    }

    /// An italic span.
    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            italic: true,
            ..Self::plain(text)
        }
    }

    /// A link span with the label as visible text.
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            link: Some(url.into()),
            ..Self::plain(text)
        }
    }
}

/// Tokenize one line into an ordered, non-overlapping sequence of spans.
///
/// Concatenating the `text` fields in order reconstructs the visible text of
/// the line exactly once. An empty input yields a single empty plain span.
pub fn format_line(input: &str) -> Vec<InlineSpan> {
    let mut cursor = Cursor { input, pos: 0 };
    let mut spans = Vec::new();

    while cursor.pos < input.len() {
        spans.push(cursor.next_span());
    }

    if spans.is_empty() {
        spans.push(InlineSpan::plain(""));
    }
    spans
}

/// Characters that can open a structured run.
fn is_special(c: char) -> bool {
    matches!(c, '*' | '_' | '[')
}

/// Immutable input view plus a byte position.
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl Cursor<'_> {
    /// Produce the next span at the current position. Ordered match list:
    /// bold before italic before link, then plain.
    fn next_span(&mut self) -> InlineSpan {
        if let Some(span) = self.match_bold() {
            return span;
        }
        if let Some(span) = self.match_italic() {
            return span;
        }
        if let Some(span) = self.match_link() {
            return span;
        }
        self.take_plain()
    }

    /// Match a run delimited by `marker` on both sides with a non-empty body.
    /// Advances the cursor past the closing marker on success.
    fn match_delimited(&mut self, marker: &str) -> Option<String> {
        let rest = &self.input[self.pos..];
        let body = rest.strip_prefix(marker)?;
        let close = body.find(marker)?;
        if close == 0 {
            return None;
        }
        let inner = &body[..close];
        self.pos += marker.len() * 2 + inner.len();
        Some(inner.to_string())
    }

    fn match_bold(&mut self) -> Option<InlineSpan> {
        for marker in ["**", "__"] {
            if let Some(text) = self.match_delimited(marker) {
                return Some(InlineSpan::bold(text));
            }
        }
        None
    }

    fn match_italic(&mut self) -> Option<InlineSpan> {
        for marker in ["*", "_"] {
            if let Some(text) = self.match_delimited(marker) {
                return Some(InlineSpan::italic(text));
            }
        }
        None
    }

    /// Match `[label](url)` with non-empty label and url.
    fn match_link(&mut self) -> Option<InlineSpan> {
        let rest = &self.input[self.pos..];
        let body = rest.strip_prefix('[')?;
        let label_end = body.find(']')?;
        if label_end == 0 {
            return None;
        }
        let after = body[label_end + 1..].strip_prefix('(')?;
        let url_end = after.find(')')?;
        if url_end == 0 {
            return None;
        }

        let label = &body[..label_end];
        let url = &after[..url_end];
        // "[" + label + "](" + url + ")"
        self.pos += label_end + url_end + 4;
        Some(InlineSpan::link(label, url))
    }

    /// Consume a maximal run of plain characters up to the next special
    /// character, or a single special character that matched no pattern.
    fn take_plain(&mut self) -> InlineSpan {
        let rest = &self.input[self.pos..];
        let first = rest.chars().next().expect("cursor not at end of input");

        if is_special(first) {
            self.pos += first.len_utf8();
            return InlineSpan::plain(first.to_string());
        }

        let end = rest
            .char_indices()
            .find(|&(_, c)| is_special(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let text = &rest[..end];
        self.pos += end;
        InlineSpan::plain(text)
    }
}
