//! Document tree consumed by the canonicalizing renderer
//!
//! The tree is produced by the external parser (see `tree_builder`) and only
//! read during rendering. Text is never copied into the tree: leaf nodes hold
//! [`Span`]s, byte ranges into the source buffer the tree was parsed from.

/// A `[start, end)` byte range into the original source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must not exceed end");
        Self { start, end }
    }

    /// An empty span anchored at `pos`. Used for synthetic text nodes that
    /// only carry a line-break flag.
    pub fn empty(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Resolve the span against the source buffer it indexes into.
    pub fn resolve<'a>(&self, source: &'a [u8]) -> &'a [u8] {
        &source[self.start..self.end]
    }
}

/// Which flavor of autolink a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoLinkKind {
    Url,
    Email,
}

/// The closed set of node kinds the renderer dispatches on.
///
/// Block kinds additionally carry a blank-before flag on their [`Node`];
/// the renderer reproduces exactly one blank line before such nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    /// ATX heading, level 1-6.
    Heading { level: u8 },
    Paragraph,
    /// Inline container used for tight list item content. Unlike a
    /// paragraph it does not force a blank line before following siblings.
    TextBlock,
    Blockquote,
    /// Indented code block. Always re-emitted fenced.
    CodeBlock { lines: Vec<Span> },
    FencedCodeBlock {
        language: Option<String>,
        lines: Vec<Span>,
    },
    HtmlBlock {
        lines: Vec<Span>,
        /// Closing line carried separately when the tree producer tracks
        /// it. The event adapter folds closing lines into `lines` and
        /// leaves this `None`.
        closure: Option<Span>,
    },
    List {
        ordered: bool,
        /// Start number of an ordered list; items renumber from here.
        start: u64,
        /// Delimiter byte for ordered lists (`.` or `)`), bullet byte for
        /// unordered lists (`-`, `*`, `+`).
        marker: u8,
        /// Tight items hold bare `TextBlock` content, loose items hold
        /// `Paragraph`s. Informational for tree consumers; the renderer
        /// keys off the item child shape.
        tight: bool,
    },
    ListItem {
        /// Column at which wrapped content lines align under the marker,
        /// relative to the marker itself.
        offset: usize,
    },
    ThematicBreak,
    Text {
        span: Span,
        soft_break: bool,
        hard_break: bool,
    },
    /// Emphasis level 1 renders `*`, level 2 renders `**`.
    Emphasis { level: u8 },
    /// One span per source line; the renderer joins them with spaces.
    CodeSpan { spans: Vec<Span> },
    Link {
        destination: String,
        title: String,
    },
    Image {
        destination: String,
        title: String,
    },
    AutoLink {
        url: String,
        kind: AutoLinkKind,
    },
    RawHtml { spans: Vec<Span> },
    Table,
    TableRow { header: bool },
    TableCell,
    Strikethrough,
    TaskCheckBox { checked: bool },
}

impl NodeKind {
    /// Block-level kinds participate in blank-line reproduction and
    /// line-prefix emission; inline kinds do not.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Document
                | NodeKind::Heading { .. }
                | NodeKind::Paragraph
                | NodeKind::TextBlock
                | NodeKind::Blockquote
                | NodeKind::CodeBlock { .. }
                | NodeKind::FencedCodeBlock { .. }
                | NodeKind::HtmlBlock { .. }
                | NodeKind::List { .. }
                | NodeKind::ListItem { .. }
                | NodeKind::ThematicBreak
                | NodeKind::Table
                | NodeKind::TableRow { .. }
                | NodeKind::TableCell
        )
    }
}

/// A node in the document tree. Child ordering is significant and preserved
/// by the walk; the tree is built once per render and holds no cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Set by the parser when a blank line preceded this block in the
    /// source. Meaningless for inline kinds.
    pub blank_before: bool,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            blank_before: false,
            children: Vec::new(),
        }
    }

    pub fn with_blank_before(mut self, blank_before: bool) -> Self {
        self.blank_before = blank_before;
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Concatenate the raw text of this node's descendants, the way link
    /// labels and image alt text are sourced.
    pub fn plain_text(&self, source: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        self.collect_plain_text(source, &mut out);
        out
    }

    fn collect_plain_text(&self, source: &[u8], out: &mut Vec<u8>) {
        match &self.kind {
            NodeKind::Text { span, .. } => out.extend_from_slice(span.resolve(source)),
            NodeKind::CodeSpan { spans } => {
                for span in spans {
                    out.extend_from_slice(span.resolve(source));
                }
            }
            _ => {
                for child in &self.children {
                    child.collect_plain_text(source, out);
                }
            }
        }
    }
}
