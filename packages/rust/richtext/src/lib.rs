//! Rich-text transformation for generated prose.
//!
//! Pure, synchronous text processing: a line-oriented block parser producing
//! a [`RichTextDocument`] tree, an inline span tokenizer, an excerpt
//! extractor with a character budget, and title extraction. None of these
//! fail on string input — malformed markup degrades to plain text.

pub mod block;
pub mod excerpt;
pub mod inline;

pub use block::{BlockNode, RichTextDocument, parse_blocks};
pub use excerpt::{DEFAULT_MAX_CHARS, extract_excerpt};
pub use inline::{InlineSpan, format_line};

/// Split the document title off the generated text.
///
/// The title is the text of the first heading-level-1 line; that line is
/// removed from the returned body. When no such line exists the title is
/// `None` and the body is returned unchanged.
pub fn split_title(text: &str) -> (Option<String>, String) {
    let mut title = None;
    let mut body_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if title.is_none() {
            if let Some(rest) = line.trim().strip_prefix("# ") {
                title = Some(rest.trim().to_string());
                continue;
            }
        }
        body_lines.push(line);
    }

    (title, body_lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_taken_from_first_h1() {
        let (title, body) = split_title("# My Article\n\nBody line.");
        assert_eq!(title.as_deref(), Some("My Article"));
        assert_eq!(body, "\nBody line.");
    }

    #[test]
    fn no_h1_leaves_body_untouched() {
        let input = "## Only a subheading\n\nBody.";
        let (title, body) = split_title(input);
        assert_eq!(title, None);
        assert_eq!(body, input);
    }

    #[test]
    fn only_first_h1_is_stripped() {
        let (title, body) = split_title("# First\ntext\n# Second");
        assert_eq!(title.as_deref(), Some("First"));
        assert_eq!(body, "text\n# Second");
    }

    #[test]
    fn title_extraction_then_block_parse() {
        let input = "# Title\n\nBody text here.\n\n## Section: Sub\n\nMore text.";
        let (title, body) = split_title(input);
        assert_eq!(title.as_deref(), Some("Title"));

        let doc = parse_blocks(&body);
        assert_eq!(doc.blocks.len(), 3);
        assert!(matches!(doc.blocks[0], BlockNode::Paragraph { .. }));
        assert_eq!(
            doc.blocks[1],
            BlockNode::Heading {
                level: 2,
                text: "Section: Sub".into()
            }
        );
        assert!(matches!(doc.blocks[2], BlockNode::Paragraph { .. }));
    }
}
