//! Line-oriented block-level parser.
//!
//! One left-to-right pass over the input lines. Per line, first match wins:
//! blank separator, horizontal rule, heading, list item, paragraph. Contiguous
//! list items of the same marker family are aggregated into a single list
//! block. There is no soft-wrap merging: every non-blank, non-list line
//! becomes its own block.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::inline::{InlineSpan, format_line};

/// A block-level node of the structured document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockNode {
    /// `#`–`######` heading. Heading text is stored verbatim, without inline
    /// formatting applied.
    Heading { level: u8, text: String },
    /// A single line of prose, tokenized into inline spans.
    Paragraph { spans: Vec<InlineSpan> },
    /// A contiguous run of list items sharing one marker family. Each item is
    /// a one-paragraph sequence of spans.
    List {
        ordered: bool,
        items: Vec<Vec<InlineSpan>>,
    },
    /// `---`, `***`, or `___` on a line of its own.
    HorizontalRule,
}

/// The structured rich-text tree handed to the rendering layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichTextDocument {
    pub blocks: Vec<BlockNode>,
}

/// Parse a full document body into a block tree, preserving source line order.
pub fn parse_blocks(text: &str) -> RichTextDocument {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.is_empty() {
            i += 1;
            continue;
        }

        if is_rule(line) {
            blocks.push(BlockNode::HorizontalRule);
            i += 1;
            continue;
        }

        if let Some((level, text)) = heading_line(line) {
            blocks.push(BlockNode::Heading {
                level,
                text: text.to_string(),
            });
            i += 1;
            continue;
        }

        if let Some((ordered, _)) = list_item(line) {
            // Greedy: consume every following line of the same marker family.
            let mut items = Vec::new();
            while i < lines.len() {
                match list_item(lines[i]) {
                    Some((item_ordered, rest)) if item_ordered == ordered => {
                        items.push(format_line(rest));
                        i += 1;
                    }
                    _ => break,
                }
            }
            blocks.push(BlockNode::List { ordered, items });
            continue;
        }

        blocks.push(BlockNode::Paragraph {
            spans: format_line(line),
        });
        i += 1;
    }

    debug!(blocks = blocks.len(), "parsed document body");
    RichTextDocument { blocks }
}

/// A horizontal-rule line, exactly.
fn is_rule(line: &str) -> bool {
    matches!(line, "---" | "***" | "___")
}

/// `#`×(1–6) followed by a space. Returns the level and the heading text.
fn heading_line(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let text = line[hashes..].strip_prefix(' ')?;
    Some((hashes as u8, text.trim()))
}

/// `- `, `* `, or `<digits>. `. Returns the marker family (ordered?) and the
/// item text after the marker.
fn list_item(line: &str) -> Option<(bool, &str)> {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some((false, rest));
    }

    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return Some((true, rest));
        }
    }
    None
}
