//! Adapter from the external parser's event stream to the document tree
//!
//! All parsing is pulldown-cmark's (CommonMark with the GFM table,
//! strikethrough and tasklist extensions enabled); this module only
//! materializes its offset-annotated events into the [`Node`] tree the
//! renderer walks. Spans are taken straight from the event byte ranges, so
//! the tree references the source buffer instead of copying text.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag};

use crate::ast::{AutoLinkKind, Node, NodeKind, Span};

/// Parser extensions the canonicalizer expects to be enabled.
fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Parse `source` with the external parser and build the document tree.
pub fn build_tree(source: &str) -> Node {
    let parser = Parser::new_ext(source, parser_options());
    let mut builder = TreeBuilder::new(source);
    for (event, range) in parser.into_offset_iter() {
        builder.event(event, range);
    }
    builder.finish()
}

struct TreeBuilder<'a> {
    source: &'a str,
    /// Nodes under construction; index 0 is the document root.
    stack: Vec<Node>,
    /// Depth of an unsupported container currently being skipped.
    skip: usize,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            stack: vec![Node::new(NodeKind::Document)],
            skip: 0,
        }
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(_) => self.end(),
            Event::Text(_) => {
                if self.skip == 0 {
                    self.text(range);
                }
            }
            Event::Code(_) => {
                if self.skip == 0 {
                    self.code_span(range);
                }
            }
            Event::Html(_) => {
                if self.skip == 0 {
                    self.html(range);
                }
            }
            Event::InlineHtml(_) => {
                if self.skip == 0 {
                    self.append(Node::new(NodeKind::RawHtml {
                        spans: vec![Span::new(range.start, range.end)],
                    }));
                }
            }
            Event::SoftBreak => self.line_break(range.start, false),
            Event::HardBreak => self.line_break(range.start, true),
            Event::Rule => {
                if self.skip == 0 {
                    let blank = self.preceded_by_blank(range.start);
                    self.append(Node::new(NodeKind::ThematicBreak).with_blank_before(blank));
                }
            }
            Event::TaskListMarker(checked) => {
                if self.skip == 0 {
                    self.append(Node::new(NodeKind::TaskCheckBox { checked }));
                }
            }
            other => {
                log::debug!("ignoring unsupported event {other:?}");
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>, range: Range<usize>) {
        if self.skip > 0 {
            self.skip += 1;
            return;
        }

        let blank = self.preceded_by_blank(range.start);
        let node = match tag {
            Tag::Paragraph => Node::new(NodeKind::Paragraph).with_blank_before(blank),
            Tag::Heading { level, .. } => {
                Node::new(NodeKind::Heading { level: level as u8 }).with_blank_before(blank)
            }
            Tag::BlockQuote(_) => Node::new(NodeKind::Blockquote).with_blank_before(blank),
            Tag::CodeBlock(CodeBlockKind::Indented) => {
                Node::new(NodeKind::CodeBlock { lines: Vec::new() }).with_blank_before(blank)
            }
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                let language = info
                    .split_whitespace()
                    .next()
                    .filter(|word| !word.is_empty())
                    .map(str::to_owned);
                Node::new(NodeKind::FencedCodeBlock {
                    language,
                    lines: Vec::new(),
                })
                .with_blank_before(blank)
            }
            Tag::HtmlBlock => Node::new(NodeKind::HtmlBlock {
                lines: Vec::new(),
                closure: None,
            })
            .with_blank_before(blank),
            Tag::List(start) => Node::new(NodeKind::List {
                ordered: start.is_some(),
                start: start.unwrap_or(0),
                marker: 0,
                tight: true,
            })
            .with_blank_before(blank),
            Tag::Item => {
                let (marker, offset) = self.scan_item_marker(range.start);
                if let Some(parent) = self.stack.last_mut() {
                    if let NodeKind::List { marker: m, .. } = &mut parent.kind {
                        if *m == 0 {
                            *m = marker;
                        }
                    }
                }
                Node::new(NodeKind::ListItem { offset }).with_blank_before(blank)
            }
            Tag::Table(_) => Node::new(NodeKind::Table).with_blank_before(blank),
            Tag::TableHead => Node::new(NodeKind::TableRow { header: true }),
            Tag::TableRow => Node::new(NodeKind::TableRow { header: false }),
            Tag::TableCell => Node::new(NodeKind::TableCell),
            Tag::Emphasis => Node::new(NodeKind::Emphasis { level: 1 }),
            Tag::Strong => Node::new(NodeKind::Emphasis { level: 2 }),
            Tag::Strikethrough => Node::new(NodeKind::Strikethrough),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => match link_type {
                LinkType::Autolink => Node::new(NodeKind::AutoLink {
                    url: dest_url.into_string(),
                    kind: AutoLinkKind::Url,
                }),
                LinkType::Email => Node::new(NodeKind::AutoLink {
                    url: dest_url.into_string(),
                    kind: AutoLinkKind::Email,
                }),
                _ => Node::new(NodeKind::Link {
                    destination: dest_url.into_string(),
                    title: title.into_string(),
                }),
            },
            Tag::Image {
                dest_url, title, ..
            } => Node::new(NodeKind::Image {
                destination: dest_url.into_string(),
                title: title.into_string(),
            }),
            other => {
                log::debug!("skipping unsupported container {other:?}");
                self.skip = 1;
                return;
            }
        };
        self.stack.push(node);
    }

    fn end(&mut self) {
        if self.skip > 0 {
            self.skip -= 1;
            return;
        }
        // The root never has a matching end event.
        if self.stack.len() < 2 {
            return;
        }
        let mut node = self.stack.pop().expect("tree builder stack underflow");

        match &node.kind {
            NodeKind::ListItem { .. } => {
                node.children = wrap_inline_runs(node.children);
            }
            NodeKind::List { .. } => {
                let loose = node.children.iter().any(|item| {
                    item.children
                        .iter()
                        .any(|child| matches!(child.kind, NodeKind::Paragraph))
                });
                if let NodeKind::List { tight, .. } = &mut node.kind {
                    *tight = !loose;
                }
            }
            _ => {}
        }

        self.append(node);
    }

    fn append(&mut self, node: Node) {
        self.stack
            .last_mut()
            .expect("tree builder stack underflow")
            .children
            .push(node);
    }

    fn text(&mut self, range: Range<usize>) {
        let source = self.source;
        let top = self.stack.last_mut().expect("tree builder stack underflow");
        match &mut top.kind {
            NodeKind::CodeBlock { lines } | NodeKind::FencedCodeBlock { lines, .. } => {
                lines.extend(split_line_spans(source, range));
            }
            NodeKind::HtmlBlock { lines, .. } => {
                lines.extend(split_line_spans(source, range));
            }
            _ => {
                top.children.push(Node::new(NodeKind::Text {
                    span: Span::new(range.start, range.end),
                    soft_break: false,
                    hard_break: false,
                }));
            }
        }
    }

    /// Inline code: the event range covers the delimiters, the node keeps
    /// only the content, split into one span per source line.
    fn code_span(&mut self, range: Range<usize>) {
        let bytes = self.source.as_bytes();
        let mut start = range.start;
        let mut end = range.end;
        while start < end && bytes[start] == b'`' {
            start += 1;
        }
        while end > start && bytes[end - 1] == b'`' {
            end -= 1;
        }
        self.append(Node::new(NodeKind::CodeSpan {
            spans: split_line_spans(self.source, start..end),
        }));
    }

    fn html(&mut self, range: Range<usize>) {
        let source = self.source;
        let top = self.stack.last_mut().expect("tree builder stack underflow");
        if let NodeKind::HtmlBlock { lines, .. } = &mut top.kind {
            lines.extend(split_line_spans(source, range));
        } else {
            top.children.push(Node::new(NodeKind::RawHtml {
                spans: vec![Span::new(range.start, range.end)],
            }));
        }
    }

    /// Breaks attach to the preceding text node, the way the external
    /// parser's tree form records them.
    fn line_break(&mut self, pos: usize, hard: bool) {
        if self.skip > 0 {
            return;
        }
        let top = self.stack.last_mut().expect("tree builder stack underflow");
        if let Some(Node {
            kind: NodeKind::Text {
                soft_break,
                hard_break,
                ..
            },
            ..
        }) = top.children.last_mut()
        {
            if hard {
                *hard_break = true;
            } else {
                *soft_break = true;
            }
        } else {
            top.children.push(Node::new(NodeKind::Text {
                span: Span::empty(pos),
                soft_break: !hard,
                hard_break: hard,
            }));
        }
    }

    /// True when the line before the one `start` sits on is blank (or
    /// blockquote-blank, i.e. only `>` markers). Also true at the first
    /// line, matching the parser's flag on a document's first block; the
    /// renderer suppresses the blank at start of output.
    fn preceded_by_blank(&self, start: usize) -> bool {
        let before = &self.source[..start.min(self.source.len())];
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let lead = &self.source[line_start..start.min(self.source.len())];
        if !lead.bytes().all(|b| b == b' ' || b == b'\t' || b == b'>') {
            // Starts mid-line (after a list marker or inline content); the
            // enclosing block owns any preceding blank.
            return false;
        }
        if line_start == 0 {
            return true;
        }
        let prev_end = line_start - 1;
        let prev_start = self.source[..prev_end].rfind('\n').map_or(0, |i| i + 1);
        self.source[prev_start..prev_end]
            .bytes()
            .all(|b| b == b' ' || b == b'\t' || b == b'>' || b == b'\r')
    }

    /// Lexically scan an item's marker to recover the marker byte (bullet
    /// or ordered-list delimiter) and the content column relative to it.
    ///
    /// The event range of a nested item starts at the line's leading
    /// indentation (and quote markers), not at the marker itself, so the
    /// scan skips ahead to the marker first and counts columns from there.
    fn scan_item_marker(&self, start: usize) -> (u8, usize) {
        let bytes = self.source.as_bytes();
        let mut i = start;
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'>') {
            i += 1;
        }
        let marker_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let marker = if i < bytes.len() { bytes[i] } else { b'-' };
        i += 1;
        let mut col = i.saturating_sub(marker_start);
        let mut saw_space = false;
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            if bytes[i] == b'\t' {
                col += 4 - (col % 4);
            } else {
                col += 1;
            }
            i += 1;
            saw_space = true;
        }
        if !saw_space {
            col += 1;
        }
        (marker, col)
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.end();
        }
        self.stack.pop().expect("tree builder lost its root")
    }
}

/// Group runs of inline children into text blocks. Tight list items arrive
/// from the parser as bare inline content; the renderer expects items to
/// contain blocks only.
fn wrap_inline_runs(children: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    let mut run: Vec<Node> = Vec::new();
    for child in children {
        if child.kind.is_block() {
            if !run.is_empty() {
                out.push(Node::new(NodeKind::TextBlock).with_children(std::mem::take(&mut run)));
            }
            out.push(child);
        } else {
            run.push(child);
        }
    }
    if !run.is_empty() {
        out.push(Node::new(NodeKind::TextBlock).with_children(run));
    }
    out
}

/// Split a byte range into spans, one per line, keeping each trailing
/// newline with its line.
fn split_line_spans(source: &str, range: Range<usize>) -> Vec<Span> {
    let bytes = source.as_bytes();
    let mut spans = Vec::new();
    let mut start = range.start;
    for i in range.start..range.end {
        if bytes[i] == b'\n' {
            spans.push(Span::new(start, i + 1));
            start = i + 1;
        }
    }
    if start < range.end {
        spans.push(Span::new(start, range.end));
    }
    spans
}
