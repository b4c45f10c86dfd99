//! Block scanner. A single line-oriented pass drives an explicit container
//! stack; no recursion into sub-parsers. Tabs are expanded to 4-column stops
//! before any classification, so indentation matching works on spaces only.

use std::collections::HashMap;

use crate::ast::{
    Alignment, Attr, AttrSet, Block, BlockKind, Document, FootnoteDef, InlineSeq, LinkDefinition,
    List, ListItem, ListKind, Table, TableRow,
};
use crate::attr::parse_attr_set;
use crate::inline;
use crate::resolve::normalize_link_label;
use crate::source_map::SourceMap;
use crate::span::Span;
use crate::warning::{Warning, WarningKind};

pub(crate) struct ParseResult {
    pub document: Document,
    pub warnings: Vec<Warning>,
    pub source_map: SourceMap,
}

pub(crate) fn parse(source: &str) -> ParseResult {
    BlockParser::new(source).run()
}

/// One source line after tab expansion. `offsets[i]` is the source offset of
/// byte `i` of `text`; bytes inserted for a tab all map to the tab itself.
struct Line {
    text: String,
    offsets: Vec<usize>,
    end: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct ListStyle {
    kind: ListKind,
    marker: u8,
}

struct ListMarker {
    style: ListStyle,
    start: Option<u64>,
    checkbox: Option<bool>,
    /// Bytes from the start of the remainder to the item's content, which is
    /// also the continuation indent for following lines.
    content_pos: usize,
}

enum ContainerKind {
    Root,
    BlockQuote,
    Div {
        open_span: Span,
        closed: bool,
        fence_len: usize,
    },
    ListItem {
        style: ListStyle,
        start: Option<u64>,
        checkbox: Option<bool>,
        cont_indent: usize,
    },
    Footnote {
        label: String,
        cont_indent: usize,
    },
}

struct Container {
    kind: ContainerKind,
    attrs: AttrSet,
    blocks: Vec<Block>,
    start: usize,
    end: usize,
    /// Blank line seen after this container's content, nothing after it yet.
    blank_pending: bool,
    /// A blank line sits between two blocks of this container.
    loose_hint: bool,
    /// The last thing seen at this level was a blank (or an item that ended
    /// in one); pending looseness for the next sibling list item.
    trailing_blank: bool,
    last_list_style: Option<ListStyle>,
}

impl Container {
    fn new(kind: ContainerKind, attrs: AttrSet, start: usize) -> Self {
        Self {
            kind,
            attrs,
            blocks: Vec::new(),
            start,
            end: start,
            blank_pending: false,
            loose_hint: false,
            trailing_blank: false,
            last_list_style: None,
        }
    }
}

struct BufLine {
    text: String,
    offsets: Vec<usize>,
    end: usize,
}

enum Leaf {
    None,
    Paragraph {
        lines: Vec<BufLine>,
        start: usize,
        end: usize,
    },
    Heading {
        level: u8,
        lines: Vec<BufLine>,
        start: usize,
        end: usize,
    },
    CodeBlock {
        fence_char: u8,
        fence_len: usize,
        indent: usize,
        lang: Option<String>,
        raw_format: Option<String>,
        lines: Vec<String>,
        closed: bool,
        open_span: Span,
        start: usize,
        end: usize,
    },
    Table {
        aligns: Vec<Alignment>,
        head: Vec<Vec<BufLine>>,
        body: Vec<Vec<BufLine>>,
        start: usize,
        end: usize,
    },
}

struct BlockParser<'a> {
    source: &'a str,
    source_map: SourceMap,
    warnings: Vec<Warning>,
    stack: Vec<Container>,
    leaf: Leaf,
    pending_attrs: Option<AttrSet>,
    link_defs: HashMap<String, LinkDefinition>,
    footnotes: Vec<FootnoteDef>,
}

impl<'a> BlockParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            source_map: SourceMap::new(source),
            warnings: Vec::new(),
            stack: vec![Container::new(ContainerKind::Root, AttrSet::empty(), 0)],
            leaf: Leaf::None,
            pending_attrs: None,
            link_defs: HashMap::new(),
            footnotes: Vec::new(),
        }
    }

    fn run(mut self) -> ParseResult {
        for line in split_lines(self.source) {
            self.process_line(&line);
        }
        self.close_leaf();
        while self.stack.len() > 1 {
            self.close_container();
        }
        let root = self.stack.pop().expect("root container");
        let document = Document {
            span: Span::new(0, self.source.len()),
            blocks: root.blocks,
            link_defs: self.link_defs,
            footnotes: self.footnotes,
            footnote_order: Vec::new(),
        };
        ParseResult {
            document,
            warnings: self.warnings,
            source_map: self.source_map,
        }
    }

    fn process_line(&mut self, line: &Line) {
        if line.text.trim().is_empty() {
            // Blank lines close paragraph-like leaves but never containers.
            self.handle_blank(line);
            return;
        }

        let (matched, pos) = self.match_continuations(line);
        if matched < self.stack.len() {
            let rest = &line.text[pos..];
            if matches!(self.leaf, Leaf::Paragraph { .. }) && !is_block_start(rest) {
                // Lazy continuation: an under-indented plain line extends the
                // open paragraph instead of closing its containers.
                self.append_paragraph_line(line, pos);
                return;
            }
            self.close_leaf();
            while self.stack.len() > matched {
                self.close_container();
            }
        }
        self.open_blocks(line, pos);
    }

    fn handle_blank(&mut self, line: &Line) {
        if let Leaf::CodeBlock { lines, end, .. } = &mut self.leaf {
            lines.push(String::new());
            *end = line.end;
            return;
        }
        self.close_leaf();
        let top = self.stack.last_mut().expect("container stack");
        if !top.blocks.is_empty() {
            top.blank_pending = true;
        }
        top.trailing_blank = true;
    }

    /// Matches the existing stack against the line prefix, outermost first.
    /// Returns the number of containers matched (root included) and the byte
    /// position where the remainder starts.
    fn match_continuations(&self, line: &Line) -> (usize, usize) {
        let bytes = line.text.as_bytes();
        let mut pos = 0;
        let mut matched = 1;
        for container in &self.stack[1..] {
            match &container.kind {
                ContainerKind::Root => {}
                ContainerKind::BlockQuote => {
                    let mut p = pos;
                    while bytes.get(p) == Some(&b' ') {
                        p += 1;
                    }
                    if bytes.get(p) == Some(&b'>')
                        && matches!(bytes.get(p + 1), None | Some(b' '))
                    {
                        p += 1;
                        if bytes.get(p) == Some(&b' ') {
                            p += 1;
                        }
                        pos = p;
                    } else {
                        break;
                    }
                }
                ContainerKind::Div { .. } => {}
                ContainerKind::ListItem { cont_indent, .. }
                | ContainerKind::Footnote { cont_indent, .. } => {
                    let mut spaces = 0;
                    while bytes.get(pos + spaces) == Some(&b' ') {
                        spaces += 1;
                    }
                    if spaces >= *cont_indent {
                        pos += cont_indent;
                    } else {
                        break;
                    }
                }
            }
            matched += 1;
        }
        (matched, pos)
    }

    fn open_blocks(&mut self, line: &Line, mut pos: usize) {
        loop {
            let rest = &line.text[pos..];
            if rest.trim().is_empty() {
                // Container markers with nothing after them (`>` alone, an
                // empty list item).
                self.handle_blank(line);
                return;
            }

            if let Leaf::CodeBlock { .. } = self.leaf {
                self.code_block_line(line, pos);
                return;
            }
            if let Leaf::Table { .. } = self.leaf {
                if classify_table_line(rest).is_some() {
                    self.table_line(line, pos);
                    return;
                }
                self.close_leaf();
            }

            if let Some(after) = quote_marker(rest) {
                self.open_container(
                    ContainerKind::BlockQuote,
                    self.offset_at(line, pos),
                    line.end,
                );
                pos += after;
                continue;
            }
            if is_thematic_break(rest) {
                self.close_leaf();
                let span = Span::new(self.offset_at(line, pos), line.end);
                self.push_block(Block {
                    span,
                    attrs: AttrSet::empty(),
                    kind: BlockKind::ThematicBreak,
                });
                return;
            }
            if let Some(marker) = parse_list_marker(rest) {
                let start_off = self.offset_at(line, pos);
                let cont_indent = marker.content_pos;
                let content_pos = marker.content_pos.min(rest.len());
                self.open_container(
                    ContainerKind::ListItem {
                        style: marker.style,
                        start: marker.start,
                        checkbox: marker.checkbox,
                        cont_indent,
                    },
                    start_off,
                    line.end,
                );
                pos += content_pos;
                continue;
            }
            if let Some((label, content_pos)) = parse_footnote_open(rest) {
                let start_off = self.offset_at(line, pos);
                self.open_container(
                    ContainerKind::Footnote {
                        label,
                        cont_indent: 2,
                    },
                    start_off,
                    line.end,
                );
                pos += content_pos.min(rest.len());
                continue;
            }
            if let Some((level, content_pos)) = parse_heading_marker(rest) {
                self.heading_line(line, pos, level, content_pos);
                return;
            }
            if let Some(fence) = parse_code_fence(rest) {
                self.close_leaf();
                let start_off = self.offset_at(line, pos);
                self.leaf = Leaf::CodeBlock {
                    fence_char: fence.ch,
                    fence_len: fence.len,
                    indent: fence.indent,
                    lang: fence.lang,
                    raw_format: fence.raw_format,
                    lines: Vec::new(),
                    closed: false,
                    open_span: Span::new(start_off, line.end),
                    start: start_off,
                    end: line.end,
                };
                return;
            }
            if let Some((fence_len, class)) = parse_div_fence(rest) {
                self.close_leaf();
                if class.is_none() && self.close_div(fence_len, line.end) {
                    return;
                }
                let start_off = self.offset_at(line, pos);
                let open_span = Span::new(start_off, line.end);
                self.open_container(
                    ContainerKind::Div {
                        open_span,
                        closed: false,
                        fence_len,
                    },
                    start_off,
                    line.end,
                );
                if let Some(class) = class {
                    let top = self.stack.last_mut().expect("container stack");
                    top.attrs.items.push(Attr {
                        key: "class".to_string(),
                        value: class,
                    });
                }
                return;
            }
            if matches!(self.leaf, Leaf::None) {
                let trimmed = rest.trim();
                if trimmed.starts_with('{')
                    && trimmed.ends_with('}')
                    && let Some(attrs) =
                        parse_attr_set(trimmed, self.offset_at(line, pos))
                {
                    self.merge_pending_attrs(attrs);
                    return;
                }
                if let Some((label, def)) = parse_link_definition(rest) {
                    self.insert_link_definition(label, def, line, pos);
                    return;
                }
                if classify_table_line(rest).is_some() {
                    self.leaf = Leaf::Table {
                        aligns: Vec::new(),
                        head: Vec::new(),
                        body: Vec::new(),
                        start: self.offset_at(line, pos),
                        end: line.end,
                    };
                    self.table_line(line, pos);
                    return;
                }
            }
            if matches!(self.leaf, Leaf::Heading { .. }) {
                self.append_heading_line(line, pos);
                return;
            }
            self.append_paragraph_line(line, pos);
            return;
        }
    }

    fn heading_line(&mut self, line: &Line, pos: usize, level: u8, content_pos: usize) {
        if let Leaf::Heading {
            level: open_level, ..
        } = &self.leaf
            && *open_level == level
        {
            self.append_heading_line(line, pos + content_pos);
            return;
        }
        self.close_leaf();
        let start = self.offset_at(line, pos);
        self.leaf = Leaf::Heading {
            level,
            lines: Vec::new(),
            start,
            end: line.end,
        };
        self.append_heading_line(line, pos + content_pos);
    }

    fn append_heading_line(&mut self, line: &Line, pos: usize) {
        let buf = slice_line(line, pos);
        if let Leaf::Heading { lines, end, .. } = &mut self.leaf {
            *end = line.end;
            lines.push(buf);
        }
    }

    fn append_paragraph_line(&mut self, line: &Line, pos: usize) {
        let buf = slice_line(line, pos);
        match &mut self.leaf {
            Leaf::Paragraph { lines, end, .. } => {
                *end = line.end;
                lines.push(buf);
            }
            _ => {
                let start = buf.offsets.first().copied().unwrap_or(line.end);
                self.leaf = Leaf::Paragraph {
                    lines: vec![buf],
                    start,
                    end: line.end,
                };
            }
        }
    }

    fn code_block_line(&mut self, line: &Line, pos: usize) {
        let rest = &line.text[pos..];
        let Leaf::CodeBlock {
            fence_char,
            fence_len,
            indent,
            ..
        } = &self.leaf
        else {
            return;
        };
        let (fence_char, fence_len, indent) = (*fence_char, *fence_len, *indent);
        let trimmed = rest.trim();
        if !trimmed.is_empty()
            && trimmed.bytes().all(|b| b == fence_char)
            && trimmed.len() >= fence_len
        {
            if let Leaf::CodeBlock { closed, end, .. } = &mut self.leaf {
                *closed = true;
                *end = line.end;
            }
            self.close_leaf();
            return;
        }
        let mut strip = 0;
        let bytes = rest.as_bytes();
        while strip < indent && bytes.get(strip) == Some(&b' ') {
            strip += 1;
        }
        if let Leaf::CodeBlock { lines, end, .. } = &mut self.leaf {
            lines.push(rest[strip..].to_string());
            *end = line.end;
        }
    }

    fn table_line(&mut self, line: &Line, pos: usize) {
        let rest = &line.text[pos..];
        let Some(parsed) = classify_table_line(rest) else {
            return;
        };
        match parsed {
            TableLineKind::Separator(new_aligns) => {
                if let Leaf::Table {
                    aligns, head, body, end, ..
                } = &mut self.leaf
                {
                    if head.is_empty() {
                        *head = std::mem::take(body);
                    }
                    *aligns = new_aligns;
                    *end = line.end;
                }
            }
            TableLineKind::Row(cells) => {
                let cells: Vec<BufLine> = cells
                    .into_iter()
                    .map(|(cell_start, cell_end)| {
                        let buf = slice_range(line, pos + cell_start, pos + cell_end);
                        trim_buf(buf, line.end)
                    })
                    .collect();
                if let Leaf::Table { body, end, .. } = &mut self.leaf {
                    body.push(cells);
                    *end = line.end;
                }
            }
        }
    }

    fn open_container(&mut self, kind: ContainerKind, start: usize, end: usize) {
        self.close_leaf();
        let attrs = self.pending_attrs.take().unwrap_or_default();
        let mut container = Container::new(kind, attrs, start);
        container.end = end;
        self.stack.push(container);
    }

    fn close_container(&mut self) {
        self.close_leaf();
        let container = self.stack.pop().expect("container stack");
        let span = Span::new(container.start, container.end);
        match container.kind {
            ContainerKind::Root => unreachable!("root container is never closed"),
            ContainerKind::BlockQuote => {
                self.push_block(Block {
                    span,
                    attrs: container.attrs,
                    kind: BlockKind::BlockQuote {
                        blocks: container.blocks,
                    },
                });
            }
            ContainerKind::Div {
                open_span, closed, ..
            } => {
                if !closed {
                    self.warn(WarningKind::UnclosedFence, open_span, "unclosed div fence");
                }
                self.push_block(Block {
                    span,
                    attrs: container.attrs,
                    kind: BlockKind::Div {
                        blocks: container.blocks,
                    },
                });
            }
            ContainerKind::ListItem {
                style,
                start,
                checkbox,
                ..
            } => {
                let item = ListItem {
                    span,
                    checkbox,
                    blocks: container.blocks,
                };
                self.append_list_item(
                    item,
                    style,
                    start,
                    container.attrs,
                    container.loose_hint,
                    container.blank_pending || container.trailing_blank,
                );
            }
            ContainerKind::Footnote { label, .. } => {
                if self.footnotes.iter().any(|def| def.label == label) {
                    self.warn(
                        WarningKind::DuplicateReferenceLabel,
                        span,
                        format!("duplicate footnote label `{label}`"),
                    );
                } else {
                    self.footnotes.push(FootnoteDef {
                        label,
                        blocks: container.blocks,
                    });
                }
            }
        }
    }

    fn append_list_item(
        &mut self,
        item: ListItem,
        style: ListStyle,
        start: Option<u64>,
        attrs: AttrSet,
        loose_item: bool,
        ended_blank: bool,
    ) {
        let parent = self.stack.last_mut().expect("container stack");
        let gap = parent.trailing_blank;
        let same_list = parent.last_list_style == Some(style)
            && matches!(
                parent.blocks.last(),
                Some(Block {
                    kind: BlockKind::List(_),
                    ..
                })
            );
        if same_list {
            if let Some(Block {
                kind: BlockKind::List(list),
                span,
                ..
            }) = parent.blocks.last_mut()
            {
                if gap || loose_item {
                    list.tight = false;
                }
                *span = span.union(item.span);
                parent.end = parent.end.max(item.span.end);
                list.items.push(item);
            }
        } else {
            let list = List {
                kind: style.kind,
                tight: !loose_item,
                start: start.filter(|n| *n != 1),
                items: vec![item],
            };
            let span = list.items[0].span;
            self.push_block(Block {
                span,
                attrs,
                kind: BlockKind::List(list),
            });
            let parent = self.stack.last_mut().expect("container stack");
            parent.last_list_style = Some(style);
        }
        let parent = self.stack.last_mut().expect("container stack");
        parent.trailing_blank = ended_blank;
    }

    /// Closes the innermost open div whose opener run is no longer than the
    /// closer run. A shorter closer matches nothing; the caller opens a new
    /// div instead.
    fn close_div(&mut self, closer_len: usize, end: usize) -> bool {
        let div_depth = self.stack.iter().rposition(|c| {
            matches!(c.kind, ContainerKind::Div { fence_len, .. } if fence_len <= closer_len)
        });
        let Some(div_depth) = div_depth else {
            return false;
        };
        while self.stack.len() > div_depth + 1 {
            self.close_container();
        }
        if let Some(container) = self.stack.last_mut() {
            container.end = container.end.max(end);
            if let ContainerKind::Div { closed, .. } = &mut container.kind {
                *closed = true;
            }
        }
        self.close_container();
        true
    }

    fn close_leaf(&mut self) {
        match std::mem::replace(&mut self.leaf, Leaf::None) {
            Leaf::None => {}
            Leaf::Paragraph { lines, start, end } => {
                let (buffer, offsets) = build_buffer(&lines);
                let content = inline::parse_inline_buffer(&buffer, &offsets, self.source.len());
                self.push_block(Block {
                    span: Span::new(start, end),
                    attrs: AttrSet::empty(),
                    kind: BlockKind::Paragraph { content },
                });
            }
            Leaf::Heading {
                level,
                lines,
                start,
                end,
            } => {
                let (buffer, offsets) = build_buffer(&lines);
                let content = inline::parse_inline_buffer(&buffer, &offsets, self.source.len());
                self.push_block(Block {
                    span: Span::new(start, end),
                    attrs: AttrSet::empty(),
                    kind: BlockKind::Heading { level, content },
                });
            }
            Leaf::CodeBlock {
                lang,
                raw_format,
                lines,
                closed,
                open_span,
                start,
                end,
                ..
            } => {
                if !closed {
                    self.warn(WarningKind::UnclosedFence, open_span, "unclosed code fence");
                }
                let text = lines.join("\n");
                let kind = match raw_format {
                    Some(format) => BlockKind::RawBlock { format, text },
                    None => BlockKind::CodeBlock { lang, text },
                };
                self.push_block(Block {
                    span: Span::new(start, end),
                    attrs: AttrSet::empty(),
                    kind,
                });
            }
            Leaf::Table {
                mut aligns,
                head,
                body,
                start,
                end,
            } => {
                let source_len = self.source.len();
                let to_rows = |rows: Vec<Vec<BufLine>>| -> Vec<TableRow> {
                    rows.into_iter()
                        .map(|cells| TableRow {
                            cells: cells
                                .into_iter()
                                .map(|cell| -> InlineSeq {
                                    inline::parse_inline_buffer(
                                        &cell.text,
                                        &cell.offsets,
                                        source_len,
                                    )
                                })
                                .collect(),
                        })
                        .collect()
                };
                let head = to_rows(head);
                let body = to_rows(body);
                let columns = head
                    .iter()
                    .chain(body.iter())
                    .map(|row| row.cells.len())
                    .max()
                    .unwrap_or(0);
                aligns.resize(columns, Alignment::Default);
                self.push_block(Block {
                    span: Span::new(start, end),
                    attrs: AttrSet::empty(),
                    kind: BlockKind::Table(Table { aligns, head, body }),
                });
            }
        }
    }

    fn push_block(&mut self, mut block: Block) {
        if let Some(attrs) = self.pending_attrs.take() {
            block.attrs.items.extend(attrs.items);
            if block.attrs.span.is_none() {
                block.attrs.span = attrs.span;
            }
        }
        let top = self.stack.last_mut().expect("container stack");
        if top.blank_pending {
            top.loose_hint = true;
            top.blank_pending = false;
        }
        top.trailing_blank = false;
        if !matches!(block.kind, BlockKind::List(_)) {
            top.last_list_style = None;
        }
        top.end = top.end.max(block.span.end);
        top.blocks.push(block);
    }

    fn merge_pending_attrs(&mut self, attrs: AttrSet) {
        match &mut self.pending_attrs {
            Some(pending) => {
                pending.items.extend(attrs.items);
            }
            None => self.pending_attrs = Some(attrs),
        }
    }

    fn insert_link_definition(
        &mut self,
        label: String,
        def: LinkDefinition,
        line: &Line,
        pos: usize,
    ) {
        let span = Span::new(self.offset_at(line, pos), line.end);
        let normalized = normalize_link_label(&label);
        if self.link_defs.contains_key(&normalized) {
            self.warn(
                WarningKind::DuplicateReferenceLabel,
                span,
                format!("duplicate reference label `{label}`"),
            );
            return;
        }
        self.link_defs.insert(normalized, def);
    }

    fn warn(&mut self, kind: WarningKind, span: Span, message: impl Into<String>) {
        let range = self.source_map.range(span);
        self.warnings.push(Warning::new(kind, range, message));
    }

    fn offset_at(&self, line: &Line, idx: usize) -> usize {
        line.offsets.get(idx).copied().unwrap_or(line.end)
    }
}

fn split_lines(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    let bytes = source.as_bytes();
    while start < bytes.len() {
        let mut end = start;
        while end < bytes.len() && bytes[end] != b'\n' {
            end += 1;
        }
        lines.push(expand_line(&source[start..end], start));
        start = end + 1;
    }
    lines
}

fn expand_line(raw: &str, start: usize) -> Line {
    let mut text = String::with_capacity(raw.len());
    let mut offsets = Vec::with_capacity(raw.len());
    let mut col = 0usize;
    for (idx, ch) in raw.char_indices() {
        if ch == '\t' {
            let fill = 4 - (col % 4);
            for _ in 0..fill {
                text.push(' ');
                offsets.push(start + idx);
            }
            col += fill;
        } else {
            text.push(ch);
            for byte in 0..ch.len_utf8() {
                offsets.push(start + idx + byte);
            }
            col += 1;
        }
    }
    Line {
        text,
        offsets,
        end: start + raw.len(),
    }
}

fn slice_line(line: &Line, pos: usize) -> BufLine {
    slice_range(line, pos, line.text.len())
}

fn slice_range(line: &Line, from: usize, to: usize) -> BufLine {
    let from = from.min(line.text.len());
    let to = to.min(line.text.len()).max(from);
    let bytes = line.text.as_bytes();
    let mut start = from;
    while start < to && bytes[start] == b' ' {
        start += 1;
    }
    BufLine {
        text: line.text[start..to].to_string(),
        offsets: line.offsets[start..to].to_vec(),
        end: line.end,
    }
}

fn trim_buf(mut buf: BufLine, end: usize) -> BufLine {
    let trimmed = buf.text.trim_end().len();
    buf.text.truncate(trimmed);
    buf.offsets.truncate(trimmed);
    buf.end = end;
    buf
}

/// Joins leaf lines into one inline buffer with parallel source offsets.
/// Trailing whitespace on the final line never carries meaning.
fn build_buffer(lines: &[BufLine]) -> (String, Vec<usize>) {
    let mut buffer = String::new();
    let mut offsets = Vec::new();
    let last = lines.len().saturating_sub(1);
    for (idx, line) in lines.iter().enumerate() {
        let text = if idx == last {
            line.text.trim_end_matches([' ', '\t'])
        } else {
            line.text.as_str()
        };
        buffer.push_str(text);
        offsets.extend_from_slice(&line.offsets[..text.len()]);
        if idx < last {
            buffer.push('\n');
            offsets.push(line.end);
        }
    }
    (buffer, offsets)
}

fn quote_marker(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut p = 0;
    while bytes.get(p) == Some(&b' ') {
        p += 1;
    }
    if bytes.get(p) == Some(&b'>') && matches!(bytes.get(p + 1), None | Some(b' ')) {
        p += 1;
        if bytes.get(p) == Some(&b' ') {
            p += 1;
        }
        Some(p)
    } else {
        None
    }
}

fn is_thematic_break(rest: &str) -> bool {
    let trimmed = rest.trim();
    let mut ch = None;
    let mut count = 0;
    for c in trimmed.chars() {
        match c {
            ' ' => {}
            '-' | '*' => {
                if ch.is_none() {
                    ch = Some(c);
                }
                if ch != Some(c) {
                    return false;
                }
                count += 1;
            }
            _ => return false,
        }
    }
    count >= 3
}

fn parse_list_marker(rest: &str) -> Option<ListMarker> {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while bytes.get(i) == Some(&b' ') {
        i += 1;
    }
    let (style, start, marker_end) = match bytes.get(i)? {
        b'-' | b'*' | b'+' => (
            ListStyle {
                kind: ListKind::Unordered,
                marker: bytes[i],
            },
            None,
            i + 1,
        ),
        b':' => (
            ListStyle {
                kind: ListKind::Definition,
                marker: b':',
            },
            None,
            i + 1,
        ),
        b'0'..=b'9' => {
            let digit_start = i;
            while matches!(bytes.get(i), Some(b'0'..=b'9')) {
                i += 1;
            }
            if i - digit_start > 9 {
                return None;
            }
            let suffix = *bytes.get(i)?;
            if suffix != b'.' && suffix != b')' {
                return None;
            }
            let number: u64 = rest[digit_start..i].parse().ok()?;
            (
                ListStyle {
                    kind: ListKind::Ordered,
                    marker: suffix,
                },
                Some(number),
                i + 1,
            )
        }
        _ => return None,
    };
    match bytes.get(marker_end) {
        None => {}
        Some(b' ') => {}
        Some(_) => return None,
    }
    let mut content = marker_end;
    while bytes.get(content) == Some(&b' ') {
        content += 1;
    }
    let mut content_pos = if content < bytes.len() {
        content
    } else {
        marker_end + 1
    };
    let mut checkbox = None;
    if style.kind == ListKind::Unordered {
        let tail = &rest[content_pos.min(rest.len())..];
        let state = if tail.starts_with("[ ]") {
            Some(false)
        } else if tail.starts_with("[x]") || tail.starts_with("[X]") {
            Some(true)
        } else {
            None
        };
        if state.is_some() {
            let after = content_pos + 3;
            if matches!(bytes.get(after), None | Some(b' ')) {
                checkbox = state;
                content_pos = after + 1;
            }
        }
    }
    Some(ListMarker {
        style,
        start,
        checkbox,
        content_pos,
    })
}

/// `[^label]:` opening a footnote definition.
fn parse_footnote_open(rest: &str) -> Option<(String, usize)> {
    let bytes = rest.as_bytes();
    if bytes.first() != Some(&b'[') || bytes.get(1) != Some(&b'^') {
        return None;
    }
    let mut i = 2;
    while i < bytes.len() && bytes[i] != b']' {
        if !(bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'-')) {
            return None;
        }
        i += 1;
    }
    if i == 2 || bytes.get(i) != Some(&b']') || bytes.get(i + 1) != Some(&b':') {
        return None;
    }
    let label = rest[2..i].to_string();
    let mut content = i + 2;
    while bytes.get(content) == Some(&b' ') {
        content += 1;
    }
    Some((label, content))
}

fn parse_heading_marker(rest: &str) -> Option<(u8, usize)> {
    let bytes = rest.as_bytes();
    let mut level = 0usize;
    while bytes.get(level) == Some(&b'#') {
        level += 1;
    }
    if level == 0 || level > 6 {
        return None;
    }
    match bytes.get(level) {
        None => Some((level as u8, level)),
        Some(b' ') => Some((level as u8, level + 1)),
        Some(_) => None,
    }
}

struct Fence {
    ch: u8,
    len: usize,
    indent: usize,
    lang: Option<String>,
    raw_format: Option<String>,
}

fn parse_code_fence(rest: &str) -> Option<Fence> {
    let bytes = rest.as_bytes();
    let mut indent = 0;
    while bytes.get(indent) == Some(&b' ') {
        indent += 1;
    }
    let ch = *bytes.get(indent)?;
    if ch != b'`' && ch != b'~' {
        return None;
    }
    let mut i = indent;
    while bytes.get(i) == Some(&ch) {
        i += 1;
    }
    let len = i - indent;
    if len < 3 {
        return None;
    }
    let info = rest[i..].trim();
    if ch == b'`' && info.contains('`') {
        return None;
    }
    let mut lang = None;
    let mut raw_format = None;
    if let Some(token) = info.split_whitespace().next() {
        if let Some(format) = token.strip_prefix('=') {
            if format.is_empty() {
                return None;
            }
            raw_format = Some(format.to_string());
        } else {
            lang = Some(token.to_string());
        }
    }
    Some(Fence {
        ch,
        len,
        indent,
        lang,
        raw_format,
    })
}

/// `:::` run with an optional class word. Returns the run length and the
/// class; a bare fence (`None` class) closes an open div of equal or shorter
/// opener length.
fn parse_div_fence(rest: &str) -> Option<(usize, Option<String>)> {
    let trimmed = rest.trim();
    let bytes = trimmed.as_bytes();
    let mut i = 0;
    while bytes.get(i) == Some(&b':') {
        i += 1;
    }
    if i < 3 {
        return None;
    }
    let class = trimmed[i..].trim();
    if class.is_empty() {
        return Some((i, None));
    }
    if !class
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-'))
    {
        return None;
    }
    Some((i, Some(class.to_string())))
}

/// `[label]: url` with an optional quoted title, all on one line.
fn parse_link_definition(rest: &str) -> Option<(String, LinkDefinition)> {
    let trimmed = rest.trim_end();
    let bytes = trimmed.as_bytes();
    if bytes.first() != Some(&b'[') || bytes.get(1) == Some(&b'^') {
        return None;
    }
    let mut i = 1;
    let mut escaped = false;
    while i < bytes.len() {
        if escaped {
            escaped = false;
        } else if bytes[i] == b'\\' {
            escaped = true;
        } else if bytes[i] == b']' {
            break;
        } else if bytes[i] == b'[' {
            return None;
        }
        i += 1;
    }
    if i >= bytes.len() || i == 1 || bytes.get(i + 1) != Some(&b':') {
        return None;
    }
    let label = trimmed[1..i].to_string();
    let mut p = i + 2;
    while bytes.get(p) == Some(&b' ') {
        p += 1;
    }
    let url_start = p;
    while p < bytes.len() && !bytes[p].is_ascii_whitespace() {
        p += 1;
    }
    let url = trimmed[url_start..p].to_string();
    while bytes.get(p) == Some(&b' ') {
        p += 1;
    }
    let title = if p < bytes.len() {
        let quote = bytes[p];
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        if bytes.last() != Some(&quote) || p + 1 >= bytes.len() - 1 {
            return None;
        }
        Some(trimmed[p + 1..bytes.len() - 1].to_string())
    } else {
        None
    };
    Some((label, LinkDefinition { url, title }))
}

enum TableLineKind {
    /// Cell boundaries as byte ranges into the remainder.
    Row(Vec<(usize, usize)>),
    Separator(Vec<Alignment>),
}

fn classify_table_line(rest: &str) -> Option<TableLineKind> {
    let trimmed_start = rest.len() - rest.trim_start().len();
    let trimmed = rest.trim();
    let bytes = trimmed.as_bytes();
    if bytes.first() != Some(&b'|') || bytes.last() != Some(&b'|') || bytes.len() < 2 {
        return None;
    }
    let mut cells = Vec::new();
    let mut cell_start = 1;
    let mut i = 1;
    let mut escaped = false;
    while i < bytes.len() {
        if escaped {
            escaped = false;
        } else if bytes[i] == b'\\' {
            escaped = true;
        } else if bytes[i] == b'|' {
            cells.push((trimmed_start + cell_start, trimmed_start + i));
            cell_start = i + 1;
        }
        i += 1;
    }
    if cells.is_empty() {
        return None;
    }
    let mut aligns = Vec::new();
    let mut separator = true;
    for (start, end) in &cells {
        let cell = rest[*start..*end].trim();
        if cell.is_empty() {
            separator = false;
            break;
        }
        let left = cell.starts_with(':');
        let right = cell.ends_with(':');
        let dashes = cell.trim_start_matches(':').trim_end_matches(':');
        if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
            separator = false;
            break;
        }
        aligns.push(match (left, right) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::Default,
        });
    }
    if separator {
        Some(TableLineKind::Separator(aligns))
    } else {
        Some(TableLineKind::Row(cells))
    }
}

fn is_block_start(rest: &str) -> bool {
    quote_marker(rest).is_some()
        || is_thematic_break(rest)
        || parse_list_marker(rest).is_some()
        || parse_footnote_open(rest).is_some()
        || parse_heading_marker(rest).is_some()
        || parse_code_fence(rest).is_some()
        || parse_div_fence(rest).is_some()
}

#[cfg(test)]
mod tests {
    use super::parse;
    use crate::ast::{BlockKind, ListKind};
    use crate::warning::WarningKind;

    #[test]
    fn quote_and_list_nest_without_recursion_limits() {
        let result = parse("> - a\n> - b\n");
        let blocks = &result.document.blocks;
        assert_eq!(blocks.len(), 1);
        let BlockKind::BlockQuote { blocks: inner } = &blocks[0].kind else {
            panic!("expected a blockquote");
        };
        let BlockKind::List(list) = &inner[0].kind else {
            panic!("expected a list inside the quote");
        };
        assert_eq!(list.items.len(), 2);
        assert!(list.tight);
    }

    #[test]
    fn blank_between_items_makes_the_list_loose() {
        let result = parse("- a\n\n- b\n");
        let BlockKind::List(list) = &result.document.blocks[0].kind else {
            panic!("expected a list");
        };
        assert!(!list.tight);
        assert_eq!(list.items.len(), 2);
    }

    #[test]
    fn ordered_start_is_kept_when_not_one() {
        let result = parse("4. a\n5. b\n");
        let BlockKind::List(list) = &result.document.blocks[0].kind else {
            panic!("expected a list");
        };
        assert_eq!(list.kind, ListKind::Ordered);
        assert_eq!(list.start, Some(4));
    }

    #[test]
    fn unclosed_fence_warns_and_runs_to_the_end() {
        let result = parse("```\ncode\n");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::UnclosedFence);
        let BlockKind::CodeBlock { text, .. } = &result.document.blocks[0].kind else {
            panic!("expected a code block");
        };
        assert_eq!(text, "code");
    }

    #[test]
    fn tabs_expand_before_classification() {
        let result = parse("- a\n\tb\n");
        let BlockKind::List(list) = &result.document.blocks[0].kind else {
            panic!("expected a list");
        };
        // The tab covers the two-column continuation indent.
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].blocks.len(), 1);
    }

    #[test]
    fn short_div_closers_do_not_close_longer_fences() {
        let result = parse("::::: note\ninside\n:::\nafter\n");
        let blocks = &result.document.blocks;
        assert_eq!(blocks.len(), 1);
        let BlockKind::Div { blocks: outer } = &blocks[0].kind else {
            panic!("expected a div");
        };
        assert!(matches!(outer[0].kind, BlockKind::Paragraph { .. }));
        // The 3-colon run cannot close a 5-colon fence; it opens a nested div
        // that keeps the following paragraph inside the container.
        let BlockKind::Div { blocks: inner } = &outer[1].kind else {
            panic!("expected a nested div");
        };
        assert!(matches!(inner[0].kind, BlockKind::Paragraph { .. }));
        // Both fences run unclosed to end of input.
        assert_eq!(result.warnings.len(), 2);
        assert!(
            result
                .warnings
                .iter()
                .all(|w| w.kind == WarningKind::UnclosedFence)
        );
    }

    #[test]
    fn longer_div_closers_close_the_fence() {
        let result = parse("::: note\ninside\n:::::\nafter\n");
        let blocks = &result.document.blocks;
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0].kind, BlockKind::Div { .. }));
        assert!(matches!(blocks[1].kind, BlockKind::Paragraph { .. }));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn duplicate_definitions_keep_the_first() {
        let result = parse("[a]: http://one\n\n[a]: http://two\n");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(
            result.warnings[0].kind,
            WarningKind::DuplicateReferenceLabel
        );
        assert_eq!(result.document.link_defs["a"].url, "http://one");
    }
}
