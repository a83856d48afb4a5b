//! mdcanon: deterministic Markdown canonicalization
//!
//! Parses Markdown with an external CommonMark+GFM parser (pulldown-cmark)
//! and re-emits it as normalized Markdown bytes: ATX headings, fenced code
//! blocks, `---` thematic breaks, renumbered ordered lists, 4-space
//! nested-list indentation, non-lazy blockquote prefixes and canonical GFM
//! tables, strikethrough and task checkboxes.
//!
//! Canonical output is stable: feeding it back through [`canonicalize`]
//! reproduces it byte for byte.
//!
//! ```
//! let canonical = mdcanon::canonicalize("1. a\n1. b\n1. c\n").unwrap();
//! assert_eq!(canonical, "1. a\n2. b\n3. c\n");
//! ```

pub mod ast;
pub mod renderer;
pub mod tree_builder;
pub mod utils;

pub use ast::{AutoLinkKind, Node, NodeKind, Span};
pub use renderer::{MarkdownRenderer, RenderError};
pub use tree_builder::build_tree;

/// Parse `source` and render it back as canonical Markdown.
///
/// Non-empty output is terminated by exactly one trailing newline; closing
/// handlers may leave extra blank lines at the very end, which carry no
/// meaning and are collapsed here.
pub fn canonicalize(source: &str) -> Result<String, RenderError> {
    let tree = build_tree(source);
    let rendered = MarkdownRenderer::new().render_to_string(&tree, source.as_bytes())?;
    if rendered.is_empty() {
        return Ok(rendered);
    }
    Ok(format!("{}\n", rendered.trim_end_matches('\n')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_empty_document() {
        assert_eq!(canonicalize("").unwrap(), "");
    }

    #[test]
    fn test_canonicalize_plain_paragraph() {
        assert_eq!(canonicalize("just some text\n").unwrap(), "just some text\n");
    }

    #[test]
    fn test_canonicalize_adds_trailing_newline() {
        assert_eq!(canonicalize("no newline at eof").unwrap(), "no newline at eof\n");
    }
}
