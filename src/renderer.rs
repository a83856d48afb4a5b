//! Canonicalizing Markdown renderer
//!
//! Walks a document tree depth-first, visiting every node on the way in and
//! on the way out, and re-emits it as normalized Markdown: ATX headings,
//! fenced code blocks, `---` thematic breaks, renumbered ordered lists,
//! 4-space nested-list indentation and non-lazy blockquote prefixes.
//!
//! Rendering is a pure function of the tree and the source bytes its spans
//! reference. The only failure mode is the output sink rejecting a write;
//! traversal state is reset on every call so a renderer value can be reused.

use std::io::Write;

use thiserror::Error;

use crate::ast::{AutoLinkKind, Node, NodeKind};
use crate::utils::{escape_html, url_escape};

/// Spaces of indentation per list nesting level.
const INDENT_WIDTH: usize = 4;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The output sink rejected a write. The walk aborts immediately and
    /// any partial output must be discarded.
    #[error("output sink error: {0}")]
    Sink(#[from] std::io::Error),
    /// A tree invariant was violated, e.g. a list item outside any list.
    /// The parser is trusted to produce well-formed trees, so this is a
    /// programming error, not a recoverable condition.
    #[error("malformed document tree: {0}")]
    MalformedTree(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkStatus {
    Continue,
    /// The handler assembled its output directly from spans; do not
    /// traverse into the node's children. The exit visit still happens.
    SkipChildren,
}

/// Numbering state for one list on the nesting stack.
///
/// Kept per depth rather than as flat fields so that finishing an inner
/// list restores the outer list's next number, marker and offset.
#[derive(Debug, Clone)]
struct ListState {
    ordered: bool,
    next: u64,
    marker: u8,
    offset: usize,
}

/// Renders a document tree to canonical Markdown bytes.
pub struct MarkdownRenderer {
    /// -1 outside blockquotes; each content line gets `"> "` repeated
    /// `quote_depth + 1` times while >= 0.
    quote_depth: isize,
    lists: Vec<ListState>,
    /// Set after a list item marker has been written, holding the quote
    /// depth at that point. The next content line continues the marker
    /// line instead of opening a fresh one, adding only the quote markers
    /// entered since the marker was written.
    pending_item: Option<isize>,
    wrote_any: bool,
    /// Run length of `\n` at the current end of output. Lets the
    /// blank-line hook guarantee exactly one blank line.
    trailing_newlines: u8,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            quote_depth: -1,
            lists: Vec::new(),
            pending_item: None,
            wrote_any: false,
            trailing_newlines: 0,
        }
    }

    /// Render `tree` to `sink`. `source` is the exact byte buffer the
    /// tree's spans index into. Identical inputs produce identical bytes.
    pub fn render<W: Write>(
        &mut self,
        tree: &Node,
        source: &[u8],
        sink: &mut W,
    ) -> Result<(), RenderError> {
        self.reset();
        log::trace!("rendering tree with {} top-level blocks", tree.children.len());
        self.walk(tree, source, sink, false)
    }

    /// Render into an in-memory buffer and return the canonical string.
    pub fn render_to_string(&mut self, tree: &Node, source: &[u8]) -> Result<String, RenderError> {
        let mut buf = Vec::new();
        self.render(tree, source, &mut buf)?;
        // Spans cut at line and token boundaries, so output is valid UTF-8
        // whenever the source is.
        Ok(String::from_utf8(buf).expect("rendered output is not valid UTF-8"))
    }

    fn reset(&mut self) {
        self.quote_depth = -1;
        self.lists.clear();
        self.pending_item = None;
        self.wrote_any = false;
        self.trailing_newlines = 0;
    }

    fn walk<W: Write>(
        &mut self,
        node: &Node,
        source: &[u8],
        w: &mut W,
        has_next: bool,
    ) -> Result<(), RenderError> {
        let status = self.handle(node, source, w, true, has_next)?;
        if status != WalkStatus::SkipChildren {
            let count = node.children.len();
            for (i, child) in node.children.iter().enumerate() {
                self.walk(child, source, w, i + 1 < count)?;
            }
        }
        self.handle(node, source, w, false, has_next)?;
        Ok(())
    }

    fn out<W: Write>(&mut self, w: &mut W, bytes: &[u8]) -> Result<(), RenderError> {
        if bytes.is_empty() {
            return Ok(());
        }
        w.write_all(bytes)?;
        self.wrote_any = true;
        for &byte in bytes {
            if byte == b'\n' {
                self.trailing_newlines = self.trailing_newlines.saturating_add(1);
            } else {
                self.trailing_newlines = 0;
            }
        }
        Ok(())
    }

    /// Blank-line hook, run before handling every entering block node.
    /// Emits exactly one blank line: suppressed at the start of output and
    /// when the preceding handler already left one.
    fn pre_render<W: Write>(
        &mut self,
        node: &Node,
        entering: bool,
        w: &mut W,
    ) -> Result<(), RenderError> {
        if entering
            && node.blank_before
            && node.kind.is_block()
            && self.wrote_any
            && self.trailing_newlines < 2
        {
            self.out(w, b"\n")?;
        }
        Ok(())
    }

    fn write_quote_prefix<W: Write>(&mut self, w: &mut W) -> Result<(), RenderError> {
        for _ in -1..self.quote_depth {
            self.out(w, b"> ")?;
        }
        Ok(())
    }

    /// Open a content line: quote markers first, then alignment under the
    /// current list item. A line continuing a just-written item marker
    /// already carries both, except for quote levels opened after the
    /// marker (a blockquote starting inside the item).
    fn line_prefix<W: Write>(&mut self, w: &mut W) -> Result<(), RenderError> {
        if let Some(marker_depth) = self.pending_item.take() {
            for _ in marker_depth..self.quote_depth {
                self.out(w, b"> ")?;
            }
            return Ok(());
        }
        self.write_quote_prefix(w)?;
        if let Some(top) = self.lists.last() {
            let width = INDENT_WIDTH * (self.lists.len() - 1) + top.offset;
            self.out(w, " ".repeat(width).as_bytes())?;
        }
        Ok(())
    }

    fn write_link<W: Write>(
        &mut self,
        w: &mut W,
        destination: &[u8],
        label: &[u8],
    ) -> Result<(), RenderError> {
        self.out(w, b"[")?;
        self.out(w, &escape_html(label))?;
        self.out(w, b"](")?;
        self.out(w, &url_escape(destination))?;
        self.out(w, b")")
    }

    fn write_code_lines<W: Write>(
        &mut self,
        w: &mut W,
        source: &[u8],
        lines: &[crate::ast::Span],
    ) -> Result<(), RenderError> {
        for line in lines {
            self.line_prefix(w)?;
            let value = line.resolve(source);
            self.out(w, value)?;
            if !value.ends_with(b"\n") {
                self.out(w, b"\n")?;
            }
        }
        Ok(())
    }

    fn handle<W: Write>(
        &mut self,
        node: &Node,
        source: &[u8],
        w: &mut W,
        entering: bool,
        has_next: bool,
    ) -> Result<WalkStatus, RenderError> {
        self.pre_render(node, entering, w)?;

        match &node.kind {
            NodeKind::Document => {
                if !entering && self.wrote_any && self.trailing_newlines == 0 {
                    self.out(w, b"\n")?;
                }
            }
            NodeKind::Heading { level } => {
                if entering {
                    self.line_prefix(w)?;
                    self.out(w, "#".repeat(*level as usize).as_bytes())?;
                    self.out(w, b" ")?;
                } else {
                    self.out(w, b"\n")?;
                }
            }
            NodeKind::Paragraph => {
                if entering {
                    self.line_prefix(w)?;
                } else {
                    self.out(w, b"\n")?;
                }
            }
            NodeKind::TextBlock => {
                if entering {
                    self.line_prefix(w)?;
                } else if has_next && !node.children.is_empty() {
                    self.out(w, b"\n")?;
                }
            }
            NodeKind::Blockquote => {
                if entering {
                    self.quote_depth += 1;
                } else {
                    self.quote_depth -= 1;
                    if self.trailing_newlines == 0 {
                        self.out(w, b"\n")?;
                    }
                }
            }
            NodeKind::CodeBlock { lines } => {
                if entering {
                    self.line_prefix(w)?;
                    self.out(w, b"```\n")?;
                    self.write_code_lines(w, source, lines)?;
                } else {
                    self.line_prefix(w)?;
                    self.out(w, b"```\n")?;
                }
            }
            NodeKind::FencedCodeBlock { language, lines } => {
                if entering {
                    self.line_prefix(w)?;
                    self.out(w, b"```")?;
                    if let Some(language) = language {
                        self.out(w, language.as_bytes())?;
                    }
                    self.out(w, b"\n")?;
                    self.write_code_lines(w, source, lines)?;
                } else {
                    self.line_prefix(w)?;
                    self.out(w, b"```\n")?;
                }
            }
            NodeKind::HtmlBlock { lines, closure } => {
                if entering {
                    self.write_code_lines(w, source, lines)?;
                } else if let Some(closure) = closure {
                    self.line_prefix(w)?;
                    let value = closure.resolve(source);
                    self.out(w, value)?;
                    if !value.ends_with(b"\n") {
                        self.out(w, b"\n")?;
                    }
                }
            }
            NodeKind::List {
                ordered,
                start,
                marker,
                ..
            } => {
                if entering {
                    self.lists.push(ListState {
                        ordered: *ordered,
                        next: *start,
                        marker: *marker,
                        offset: 0,
                    });
                } else {
                    self.lists.pop();
                }
            }
            NodeKind::ListItem { offset } => {
                if entering {
                    let Some(top) = self.lists.last_mut() else {
                        return Err(RenderError::MalformedTree("list item outside of any list"));
                    };
                    top.offset = *offset;
                    let (ordered, marker, number) = (top.ordered, top.marker, top.next);
                    if ordered {
                        top.next += 1;
                    }

                    self.write_quote_prefix(w)?;
                    let depth = self.lists.len() - 1;
                    self.out(w, " ".repeat(INDENT_WIDTH * depth).as_bytes())?;

                    let marker_width = if ordered {
                        let digits = number.to_string();
                        self.out(w, digits.as_bytes())?;
                        self.out(w, &[marker])?;
                        digits.len() + 1
                    } else {
                        self.out(w, &[marker])?;
                        1
                    };
                    // Align content at the item's offset column, always at
                    // least one space after the marker.
                    let padding = offset.saturating_sub(marker_width).max(1);
                    self.out(w, " ".repeat(padding).as_bytes())?;
                    self.pending_item = Some(self.quote_depth);
                } else {
                    self.pending_item = None;
                    if self.trailing_newlines == 0 {
                        self.out(w, b"\n")?;
                    }
                }
            }
            NodeKind::ThematicBreak => {
                if entering {
                    self.line_prefix(w)?;
                    self.out(w, b"---")?;
                } else {
                    self.out(w, b"\n")?;
                }
            }
            NodeKind::Text {
                span,
                soft_break,
                hard_break,
            } => {
                if entering {
                    self.out(w, span.resolve(source))?;
                    if *soft_break || *hard_break {
                        self.out(w, b"\n")?;
                        self.line_prefix(w)?;
                    }
                }
            }
            NodeKind::Emphasis { level } => {
                self.out(w, "*".repeat(*level as usize).as_bytes())?;
            }
            NodeKind::CodeSpan { spans } => {
                if entering {
                    self.out(w, b"`")?;
                    for (i, span) in spans.iter().enumerate() {
                        let value = span.resolve(source);
                        // Multi-line code spans canonicalize to one line:
                        // each trailing newline becomes a single space.
                        if let Some(stripped) = value.strip_suffix(b"\n") {
                            self.out(w, stripped)?;
                            if i + 1 < spans.len() {
                                self.out(w, b" ")?;
                            }
                        } else {
                            self.out(w, value)?;
                        }
                    }
                    return Ok(WalkStatus::SkipChildren);
                }
                self.out(w, b"`")?;
            }
            NodeKind::Link { destination, .. } => {
                if entering {
                    let label = node.plain_text(source);
                    self.write_link(w, destination.as_bytes(), &label)?;
                    return Ok(WalkStatus::SkipChildren);
                }
            }
            NodeKind::Image { destination, .. } => {
                if entering {
                    let alt = node.plain_text(source);
                    self.out(w, b"!")?;
                    self.write_link(w, destination.as_bytes(), &alt)?;
                    return Ok(WalkStatus::SkipChildren);
                }
            }
            NodeKind::AutoLink { url, kind } => {
                if entering {
                    let label = node.plain_text(source);
                    let mut destination = url.clone().into_bytes();
                    if *kind == AutoLinkKind::Email && !has_mailto_prefix(&destination) {
                        let mut prefixed = b"mailto:".to_vec();
                        prefixed.extend_from_slice(&destination);
                        destination = prefixed;
                    }
                    self.write_link(w, &destination, &label)?;
                    return Ok(WalkStatus::SkipChildren);
                }
            }
            NodeKind::RawHtml { spans } => {
                if entering {
                    for span in spans {
                        self.out(w, span.resolve(source))?;
                    }
                    return Ok(WalkStatus::SkipChildren);
                }
            }
            NodeKind::Table => {}
            NodeKind::TableRow { header } => {
                if entering {
                    self.line_prefix(w)?;
                } else {
                    self.out(w, b"|\n")?;
                    if *header {
                        // Separator row, one `---` per header cell.
                        self.line_prefix(w)?;
                        self.out(w, b"|")?;
                        for _ in 0..node.children.len() {
                            self.out(w, b" --- |")?;
                        }
                        self.out(w, b"\n")?;
                    }
                }
            }
            NodeKind::TableCell => {
                if entering {
                    self.out(w, b"| ")?;
                } else {
                    self.out(w, b" ")?;
                }
            }
            NodeKind::Strikethrough => {
                self.out(w, b"~~")?;
            }
            NodeKind::TaskCheckBox { checked } => {
                if entering {
                    self.out(w, if *checked { b"[x] " } else { b"[ ] " })?;
                }
            }
        }

        Ok(WalkStatus::Continue)
    }
}

fn has_mailto_prefix(url: &[u8]) -> bool {
    url.len() >= 7 && url[..7].eq_ignore_ascii_case(b"mailto:")
}
