use std::collections::HashMap;

use crate::span::Span;

pub type InlineSeq = Vec<Inline>;

/// Root of the AST. Owns the block tree, the reference-definition table
/// (keys are normalized labels) and footnote definitions in source order.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub span: Span,
    pub blocks: Vec<Block>,
    pub link_defs: HashMap<String, LinkDefinition>,
    pub footnotes: Vec<FootnoteDef>,
    /// Labels of footnotes actually referenced, in first-use order.
    /// Populated by the resolver; empty on a freshly parsed document.
    pub footnote_order: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub span: Span,
    pub attrs: AttrSet,
    pub kind: BlockKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BlockKind {
    Paragraph {
        content: InlineSeq,
    },
    Heading {
        level: u8,
        content: InlineSeq,
    },
    /// Fenced code. Contents are verbatim and never inline-scanned.
    CodeBlock {
        lang: Option<String>,
        text: String,
    },
    /// Fenced raw output for one target format (` ```=html `).
    RawBlock {
        format: String,
        text: String,
    },
    BlockQuote {
        blocks: Vec<Block>,
    },
    List(List),
    ThematicBreak,
    Table(Table),
    /// `:::` fenced container; attributes carry its class.
    Div {
        blocks: Vec<Block>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct List {
    pub kind: ListKind,
    pub tight: bool,
    /// Start number of an ordered list, when it is not 1.
    pub start: Option<u64>,
    pub items: Vec<ListItem>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListKind {
    Unordered,
    Ordered,
    Definition,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListItem {
    pub span: Span,
    /// Task-list state: `Some(true)` for `[x]`, `Some(false)` for `[ ]`.
    pub checkbox: Option<bool>,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub aligns: Vec<Alignment>,
    pub head: Vec<TableRow>,
    pub body: Vec<TableRow>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub cells: Vec<InlineSeq>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Alignment {
    Default,
    Left,
    Center,
    Right,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Inline {
    pub span: Span,
    pub attrs: AttrSet,
    pub kind: InlineKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InlineKind {
    Text(String),
    Emph(InlineSeq),
    Strong(InlineSeq),
    Subscript(InlineSeq),
    Superscript(InlineSeq),
    /// Backtick span; verbatim, never scanned further.
    Verbatim(String),
    /// Verbatim span tagged for one output format (`` `...`{=html} ``).
    RawInline {
        format: String,
        text: String,
    },
    Link {
        url: String,
        title: Option<String>,
        children: InlineSeq,
    },
    Image {
        url: String,
        title: Option<String>,
        alt: InlineSeq,
    },
    /// `[text][label]` before resolution; the resolver rewrites this to a
    /// `Link` or, for a dangling label, back to literal text.
    LinkRef {
        label: String,
        children: InlineSeq,
        meta: RefMeta,
    },
    ImageRef {
        label: String,
        alt: InlineSeq,
        meta: RefMeta,
    },
    /// Bracketed span with attributes: `[text]{.cls}`.
    Span(InlineSeq),
    /// `:name:`.
    Symbol(String),
    FootnoteRef {
        label: String,
        /// 1-based footnote number, assigned in first-use order by the
        /// resolver.
        index: Option<usize>,
    },
    SoftBreak,
    HardBreak,
}

/// Enough of the original bracket syntax to reconstruct it literally when a
/// reference label has no definition.
#[derive(Clone, Debug, PartialEq)]
pub struct RefMeta {
    pub opener_span: Span,
    pub closer_span: Span,
    /// False for the collapsed form `[text][]`.
    pub explicit_label: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkDefinition {
    pub url: String,
    pub title: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FootnoteDef {
    pub label: String,
    pub blocks: Vec<Block>,
}

/// Attribute set attached to a block or inline node. Insertion order is
/// preserved so rendering is stable; `#id` and `.class` sugar desugars to
/// `id` and `class` items at parse time.
#[derive(Clone, Debug, PartialEq)]
pub struct AttrSet {
    pub span: Option<Span>,
    pub items: Vec<Attr>,
}

impl AttrSet {
    pub fn empty() -> Self {
        Self {
            span: None,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.key == key)
            .map(|item| item.value.as_str())
    }
}

impl Default for AttrSet {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: String,
}
