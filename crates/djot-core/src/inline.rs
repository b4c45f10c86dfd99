//! Inline scanner. Consumes the flattened text of one leaf block and
//! produces an inline sequence. Emphasis uses delimiter and bracket stacks;
//! reference links are left unresolved for the resolver pass.

use crate::ast::{AttrSet, Inline, InlineKind, InlineSeq, RefMeta};
use crate::attr::parse_attr_set;
use crate::span::Span;

#[derive(Clone, Debug)]
struct Delimiter {
    ch: u8,
    len: usize,
    node_index: usize,
    can_open: bool,
    can_close: bool,
}

#[derive(Clone, Debug)]
struct BracketEntry {
    node_index: usize,
    start: usize,
    image: bool,
    active: bool,
}

/// Scans a pre-built buffer whose bytes were collected from non-contiguous
/// source lines. `offsets[i]` is the source offset of buffer byte `i`.
pub(crate) fn parse_inline_buffer(buffer: &str, offsets: &[usize], source_len: usize) -> InlineSeq {
    let scanner = Scanner {
        offsets,
        source_len,
    };
    scanner.parse_range(buffer, 0, buffer.len())
}

struct Scanner<'a> {
    offsets: &'a [usize],
    source_len: usize,
}

impl Scanner<'_> {
    fn parse_range(&self, buffer: &str, start: usize, end: usize) -> InlineSeq {
        let bytes = buffer.as_bytes();
        let mut out: InlineSeq = Vec::new();
        let mut delims: Vec<Delimiter> = Vec::new();
        let mut brackets: Vec<BracketEntry> = Vec::new();
        let mut text_buf: Vec<u8> = Vec::new();
        let mut text_start = start;
        let mut i = start;

        while i < end {
            let b = bytes[i];
            match b {
                b'\\' => {
                    if i + 1 < end {
                        let next = bytes[i + 1];
                        if next == b'\n' {
                            self.flush_text(&mut out, &mut text_buf, &mut text_start, i);
                            out.push(self.node(i, i + 2, InlineKind::HardBreak));
                            i += 2;
                            text_start = i;
                            continue;
                        }
                        if next.is_ascii_punctuation() {
                            if text_buf.is_empty() {
                                text_start = i;
                            }
                            text_buf.push(next);
                            i += 2;
                            continue;
                        }
                    }
                    if text_buf.is_empty() {
                        text_start = i;
                    }
                    text_buf.push(b'\\');
                    i += 1;
                    continue;
                }
                b'`' => {
                    if let Some((inline, next)) = self.parse_verbatim(buffer, i, end) {
                        self.flush_text(&mut out, &mut text_buf, &mut text_start, i);
                        out.push(inline);
                        i = next;
                        text_start = i;
                        continue;
                    }
                    let run_len = count_run(bytes, i, end, b'`');
                    if text_buf.is_empty() {
                        text_start = i;
                    }
                    text_buf.extend(std::iter::repeat_n(b'`', run_len));
                    i += run_len;
                    continue;
                }
                b'<' => {
                    if let Some((inline, next)) = self.parse_autolink(buffer, i, end) {
                        self.flush_text(&mut out, &mut text_buf, &mut text_start, i);
                        out.push(inline);
                        i = next;
                        text_start = i;
                        continue;
                    }
                }
                b':' => {
                    if let Some((inline, next)) = self.parse_symbol(buffer, i, end) {
                        self.flush_text(&mut out, &mut text_buf, &mut text_start, i);
                        out.push(inline);
                        i = next;
                        text_start = i;
                        continue;
                    }
                }
                b'!' => {
                    if i + 1 < end && bytes[i + 1] == b'[' {
                        self.flush_text(&mut out, &mut text_buf, &mut text_start, i);
                        out.push(self.text_node(i, i + 2, "!["));
                        brackets.push(BracketEntry {
                            node_index: out.len() - 1,
                            start: i,
                            image: true,
                            active: true,
                        });
                        i += 2;
                        text_start = i;
                        continue;
                    }
                }
                b'[' => {
                    if let Some((inline, next)) = self.parse_footnote_ref(buffer, i, end) {
                        self.flush_text(&mut out, &mut text_buf, &mut text_start, i);
                        out.push(inline);
                        i = next;
                        text_start = i;
                        continue;
                    }
                    self.flush_text(&mut out, &mut text_buf, &mut text_start, i);
                    out.push(self.text_node(i, i + 1, "["));
                    brackets.push(BracketEntry {
                        node_index: out.len() - 1,
                        start: i,
                        image: false,
                        active: true,
                    });
                    i += 1;
                    text_start = i;
                    continue;
                }
                b']' => {
                    self.flush_text(&mut out, &mut text_buf, &mut text_start, i);
                    if let Some(next) =
                        self.try_close_bracket(buffer, end, i, &mut out, &mut delims, &mut brackets)
                    {
                        i = next;
                        text_start = i;
                        continue;
                    }
                    if text_buf.is_empty() {
                        text_start = i;
                    }
                    text_buf.push(b']');
                    i += 1;
                    continue;
                }
                b'{' => {
                    // Attribute sets attach to the node just closed:
                    // `[text]{.cls}` is handled at `]`, this arm catches
                    // `` `code`{=html} `` leftovers, links and autolinks.
                    if text_buf.is_empty()
                        && let Some(next) = self.try_attach_attrs(buffer, i, end, &mut out)
                    {
                        i = next;
                        text_start = i;
                        continue;
                    }
                }
                b'_' | b'*' | b'~' | b'^' => {
                    let run_len = count_run(bytes, i, end, b);
                    let (can_open, can_close) = delimiter_properties(buffer, start, end, i, run_len);
                    self.flush_text(&mut out, &mut text_buf, &mut text_start, i);
                    let text: String = std::iter::repeat_n(b as char, run_len).collect();
                    out.push(self.text_node(i, i + run_len, &text));
                    if can_open || can_close {
                        delims.push(Delimiter {
                            ch: b,
                            len: run_len,
                            node_index: out.len() - 1,
                            can_open,
                            can_close,
                        });
                    }
                    i += run_len;
                    text_start = i;
                    continue;
                }
                b'\n' => {
                    let trailing = text_buf
                        .iter()
                        .rev()
                        .take_while(|byte| **byte == b' ')
                        .count();
                    let hard_break = trailing >= 2;
                    for _ in 0..trailing {
                        text_buf.pop();
                    }
                    self.flush_text(&mut out, &mut text_buf, &mut text_start, i);
                    let kind = if hard_break {
                        InlineKind::HardBreak
                    } else {
                        InlineKind::SoftBreak
                    };
                    out.push(self.node(i, i + 1, kind));
                    i += 1;
                    text_start = i;
                    continue;
                }
                _ => {}
            }
            if text_buf.is_empty() {
                text_start = i;
            }
            text_buf.push(b);
            i += 1;
        }

        self.flush_text(&mut out, &mut text_buf, &mut text_start, end);
        process_emphasis(&mut out, &mut delims);
        attach_deferred_attrs(&mut out);
        out
    }

    fn flush_text(
        &self,
        out: &mut InlineSeq,
        text_buf: &mut Vec<u8>,
        text_start: &mut usize,
        current: usize,
    ) {
        if text_buf.is_empty() {
            *text_start = current;
            return;
        }
        let span = self.span_at(*text_start, current);
        let bytes = std::mem::take(text_buf);
        let text = match String::from_utf8(bytes) {
            Ok(value) => value,
            Err(err) => String::from_utf8_lossy(&err.into_bytes()).to_string(),
        };
        out.push(Inline {
            span,
            attrs: AttrSet::empty(),
            kind: InlineKind::Text(text),
        });
        *text_start = current;
    }

    fn text_node(&self, start: usize, end: usize, text: &str) -> Inline {
        self.node(start, end, InlineKind::Text(text.to_string()))
    }

    fn node(&self, start: usize, end: usize, kind: InlineKind) -> Inline {
        Inline {
            span: self.span_at(start, end),
            attrs: AttrSet::empty(),
            kind,
        }
    }

    fn span_at(&self, start: usize, end: usize) -> Span {
        let start_off = self.offsets.get(start).copied().unwrap_or(self.source_len);
        let end_off = if end < self.offsets.len() {
            self.offsets[end]
        } else if let Some(last) = self.offsets.last() {
            (last + 1).min(self.source_len)
        } else {
            self.source_len
        };
        Span::new(start_off, end_off.min(self.source_len))
    }

    /// Backtick span. A run of N backticks closes only on a matching run of
    /// exactly N. One space is trimmed from each side when the content has
    /// more than spaces, so `` ` `` itself can be quoted. A trailing
    /// `{=format}` turns the span into raw output.
    fn parse_verbatim(&self, buffer: &str, start: usize, end: usize) -> Option<(Inline, usize)> {
        let bytes = buffer.as_bytes();
        let run_len = count_run(bytes, start, end, b'`');
        let mut i = start + run_len;
        while i < end {
            if bytes[i] == b'`' {
                let close_len = count_run(bytes, i, end, b'`');
                if close_len == run_len {
                    let mut content = buffer[start + run_len..i].replace('\n', " ");
                    if content.starts_with(' ')
                        && content.ends_with(' ')
                        && content.len() >= 2
                        && content.bytes().any(|b| b != b' ')
                    {
                        content = content[1..content.len() - 1].to_string();
                    }
                    let close_end = i + run_len;
                    if let Some((format, next)) = parse_raw_format(buffer, close_end, end) {
                        let inline = self.node(
                            start,
                            next,
                            InlineKind::RawInline {
                                format,
                                text: content,
                            },
                        );
                        return Some((inline, next));
                    }
                    let inline = self.node(start, close_end, InlineKind::Verbatim(content));
                    return Some((inline, close_end));
                }
                i += close_len;
                continue;
            }
            i += 1;
        }
        None
    }

    fn parse_autolink(&self, buffer: &str, start: usize, end: usize) -> Option<(Inline, usize)> {
        let bytes = buffer.as_bytes();
        if start + 2 >= end {
            return None;
        }
        let mut i = start + 1;
        while i < end {
            let b = bytes[i];
            if b == b'>' {
                break;
            }
            if b.is_ascii_whitespace() || b == b'<' {
                return None;
            }
            i += 1;
        }
        if i >= end || bytes[i] != b'>' || i == start + 1 {
            return None;
        }
        let inner = &buffer[start + 1..i];
        let url = if inner.contains(':') {
            inner.to_string()
        } else if inner.contains('@') {
            format!("mailto:{inner}")
        } else {
            return None;
        };
        let child = self.node(start + 1, i, InlineKind::Text(inner.to_string()));
        let inline = self.node(
            start,
            i + 1,
            InlineKind::Link {
                url,
                title: None,
                children: vec![child],
            },
        );
        Some((inline, i + 1))
    }

    fn parse_symbol(&self, buffer: &str, start: usize, end: usize) -> Option<(Inline, usize)> {
        let bytes = buffer.as_bytes();
        let mut i = start + 1;
        while i < end {
            let b = bytes[i];
            if b == b':' {
                break;
            }
            if !(b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'+')) {
                return None;
            }
            i += 1;
        }
        if i >= end || bytes[i] != b':' || i == start + 1 {
            return None;
        }
        let name = buffer[start + 1..i].to_string();
        Some((self.node(start, i + 1, InlineKind::Symbol(name)), i + 1))
    }

    fn parse_footnote_ref(&self, buffer: &str, start: usize, end: usize) -> Option<(Inline, usize)> {
        let bytes = buffer.as_bytes();
        if start + 2 >= end || bytes[start + 1] != b'^' {
            return None;
        }
        let mut i = start + 2;
        while i < end {
            let b = bytes[i];
            if b == b']' {
                break;
            }
            if !(b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-')) {
                return None;
            }
            i += 1;
        }
        if i >= end || bytes[i] != b']' || i == start + 2 {
            return None;
        }
        let label = buffer[start + 2..i].to_string();
        let inline = self.node(start, i + 1, InlineKind::FootnoteRef { label, index: None });
        Some((inline, i + 1))
    }

    /// `{...}` immediately after a closed node attaches attributes to it.
    /// Plain text never takes inline attributes here; the braces stay
    /// literal.
    fn try_attach_attrs(
        &self,
        buffer: &str,
        start: usize,
        end: usize,
        out: &mut InlineSeq,
    ) -> Option<usize> {
        let last = out.last_mut()?;
        if matches!(
            last.kind,
            InlineKind::Text(_) | InlineKind::SoftBreak | InlineKind::HardBreak
        ) {
            return None;
        }
        let close = find_attr_end(buffer.as_bytes(), start, end)?;
        let attrs = parse_attr_set(&buffer[start..=close], self.offset_at(start))?;
        last.attrs.items.extend(attrs.items);
        last.attrs.span = attrs.span;
        last.span = last.span.union(self.span_at(start, close + 1));
        Some(close + 1)
    }

    fn offset_at(&self, idx: usize) -> usize {
        self.offsets.get(idx).copied().unwrap_or(self.source_len)
    }

    fn try_close_bracket(
        &self,
        buffer: &str,
        end: usize,
        current: usize,
        out: &mut InlineSeq,
        delims: &mut Vec<Delimiter>,
        brackets: &mut Vec<BracketEntry>,
    ) -> Option<usize> {
        let opener_pos = brackets.iter().rposition(|entry| entry.active)?;
        let opener = brackets[opener_pos].clone();
        let bytes = buffer.as_bytes();

        enum Closed {
            Inline {
                url: String,
                title: Option<String>,
                close: usize,
            },
            Reference {
                label: Option<String>,
                close: usize,
            },
            Span {
                attrs: AttrSet,
                close: usize,
            },
        }

        let after = current + 1;
        let parsed = if let Some((url, title, close)) =
            parse_inline_link_destination(buffer, after, end)
        {
            Closed::Inline { url, title, close }
        } else if after < end && bytes[after] == b'[' {
            let (label_end, had_newline) = find_bracket_end(bytes, after + 1, end)?;
            if had_newline {
                return None;
            }
            let raw = buffer[after + 1..label_end].to_string();
            let label = if raw.is_empty() { None } else { Some(raw) };
            Closed::Reference {
                label,
                close: label_end,
            }
        } else if !opener.image && after < end && bytes[after] == b'{' {
            let close = find_attr_end(bytes, after, end)?;
            let attrs = parse_attr_set(&buffer[after..=close], self.offset_at(after))?;
            Closed::Span { attrs, close }
        } else {
            brackets.remove(opener_pos);
            return None;
        };

        if opener.node_index >= out.len() {
            return None;
        }
        let close = match &parsed {
            Closed::Inline { close, .. } => *close,
            Closed::Reference { close, .. } => *close,
            Closed::Span { close, .. } => *close,
        };

        let mut children = out.split_off(opener.node_index + 1);
        out.pop()?;

        // Emphasis inside the bracket resolves against the inner delimiters
        // only; outer delimiters can no longer pair across the node.
        let mut child_delims = Vec::new();
        let mut remaining = Vec::new();
        for delim in delims.drain(..) {
            if delim.node_index > opener.node_index {
                let mut shifted = delim;
                shifted.node_index -= opener.node_index + 1;
                child_delims.push(shifted);
            } else {
                remaining.push(delim);
            }
        }
        *delims = remaining;
        if !child_delims.is_empty() {
            process_emphasis(&mut children, &mut child_delims);
            attach_deferred_attrs(&mut children);
        }

        let span = self.span_at(opener.start, close + 1);
        let mut attrs = AttrSet::empty();
        let kind = match parsed {
            Closed::Inline { url, title, .. } => {
                if opener.image {
                    InlineKind::Image {
                        url,
                        title,
                        alt: children,
                    }
                } else {
                    InlineKind::Link {
                        url,
                        title,
                        children,
                    }
                }
            }
            Closed::Reference { label, .. } => {
                let explicit_label = label.is_some();
                let label = label.unwrap_or_else(|| plain_text(&children));
                let meta = RefMeta {
                    opener_span: self.span_at(
                        opener.start,
                        opener.start + if opener.image { 2 } else { 1 },
                    ),
                    closer_span: self.span_at(current, close + 1),
                    explicit_label,
                };
                if opener.image {
                    InlineKind::ImageRef {
                        label,
                        alt: children,
                        meta,
                    }
                } else {
                    InlineKind::LinkRef {
                        label,
                        children,
                        meta,
                    }
                }
            }
            Closed::Span {
                attrs: span_attrs, ..
            } => {
                attrs = span_attrs;
                InlineKind::Span(children)
            }
        };
        out.push(Inline { span, attrs, kind });

        if !opener.image {
            for entry in brackets.iter_mut() {
                if !entry.image {
                    entry.active = false;
                }
            }
        }
        brackets.retain(|entry| entry.node_index < opener.node_index);
        Some(close + 1)
    }
}

/// A delimiter run can open when not followed by whitespace and close when
/// not preceded by it. Deliberately simpler than CommonMark flanking.
fn delimiter_properties(
    buffer: &str,
    start: usize,
    end: usize,
    pos: usize,
    run_len: usize,
) -> (bool, bool) {
    let before = if pos > start {
        buffer[..pos].chars().next_back()
    } else {
        None
    };
    let after_pos = pos + run_len;
    let after = if after_pos < end {
        buffer[after_pos..end].chars().next()
    } else {
        None
    };
    let can_open = matches!(after, Some(ch) if !ch.is_whitespace());
    let can_close = matches!(before, Some(ch) if !ch.is_whitespace());
    (can_open, can_close)
}

fn process_emphasis(out: &mut InlineSeq, delims: &mut Vec<Delimiter>) {
    loop {
        let Some(closer_index) = delims.iter().position(|delim| delim.can_close) else {
            break;
        };
        let closer = delims[closer_index].clone();
        let opener_index = (0..closer_index)
            .rev()
            .find(|&idx| delims[idx].ch == closer.ch && delims[idx].can_open);
        let Some(opener_index) = opener_index else {
            delims[closer_index].can_close = false;
            continue;
        };
        apply_emphasis(out, delims, opener_index, closer_index);
    }
}

fn emphasis_kind(ch: u8, children: InlineSeq) -> InlineKind {
    match ch {
        b'_' => InlineKind::Emph(children),
        b'*' => InlineKind::Strong(children),
        b'~' => InlineKind::Subscript(children),
        _ => InlineKind::Superscript(children),
    }
}

fn apply_emphasis(
    out: &mut InlineSeq,
    delims: &mut Vec<Delimiter>,
    opener_index: usize,
    closer_index: usize,
) {
    let opener = delims[opener_index].clone();
    let closer = delims[closer_index].clone();
    if opener.node_index >= closer.node_index {
        delims[closer_index].can_close = false;
        return;
    }
    let removed_len = closer.node_index + 1 - opener.node_index;
    let removed: Vec<Inline> = out
        .drain(opener.node_index..closer.node_index + 1)
        .collect();
    let mut iter = removed.into_iter();
    let Some(opener_node) = iter.next() else {
        return;
    };
    let Some(closer_node) = iter.next_back() else {
        return;
    };
    let children: Vec<Inline> = iter.collect();

    let opener_remain = opener.len - 1;
    let closer_remain = closer.len - 1;
    let mut replacement = Vec::new();
    if opener_remain > 0 {
        let span = Span::new(
            opener_node.span.start,
            opener_node.span.start + opener_remain,
        );
        let text: String = std::iter::repeat_n(opener.ch as char, opener_remain).collect();
        replacement.push(Inline {
            span,
            attrs: AttrSet::empty(),
            kind: InlineKind::Text(text),
        });
    }

    let emph_span = Span::new(
        opener_node.span.start + opener_remain,
        closer_node.span.end.saturating_sub(closer_remain),
    );
    replacement.push(Inline {
        span: emph_span,
        attrs: AttrSet::empty(),
        kind: emphasis_kind(opener.ch, children),
    });

    if closer_remain > 0 {
        let span = Span::new(
            closer_node.span.end.saturating_sub(closer_remain),
            closer_node.span.end,
        );
        let text: String = std::iter::repeat_n(closer.ch as char, closer_remain).collect();
        replacement.push(Inline {
            span,
            attrs: AttrSet::empty(),
            kind: InlineKind::Text(text),
        });
    }

    let replacement_len = replacement.len();
    out.splice(opener.node_index..opener.node_index, replacement);

    let delta = replacement_len as isize - removed_len as isize;
    let mut updated = Vec::new();
    for (idx, delim) in delims.iter().enumerate() {
        if idx == opener_index || idx == closer_index {
            continue;
        }
        if delim.node_index < opener.node_index {
            updated.push(delim.clone());
        } else if delim.node_index > closer.node_index {
            let mut shifted = delim.clone();
            if delta.is_negative() {
                shifted.node_index = shifted.node_index.saturating_sub(delta.unsigned_abs());
            } else {
                shifted.node_index += delta.unsigned_abs();
            }
            updated.push(shifted);
        }
    }

    let mut next_index = opener.node_index;
    if opener_remain > 0 {
        updated.push(Delimiter {
            len: opener_remain,
            node_index: next_index,
            ..opener
        });
        next_index += 1;
    }
    next_index += 1;
    if closer_remain > 0 {
        updated.push(Delimiter {
            len: closer_remain,
            node_index: next_index,
            ..closer
        });
    }
    updated.sort_by_key(|delim| delim.node_index);
    *delims = updated;
}

/// Emphasis nodes exist only after delimiter matching, so a `{...}` written
/// right behind one is still literal text when the scanner sees it. This
/// pass claims those braces for the preceding emphasis node.
fn attach_deferred_attrs(out: &mut InlineSeq) {
    let mut i = 1;
    while i < out.len() {
        let prev_takes_attrs = matches!(
            out[i - 1].kind,
            InlineKind::Emph(_)
                | InlineKind::Strong(_)
                | InlineKind::Subscript(_)
                | InlineKind::Superscript(_)
        );
        let parsed = if prev_takes_attrs
            && let InlineKind::Text(text) = &out[i].kind
            && text.starts_with('{')
        {
            find_attr_end(text.as_bytes(), 0, text.len()).and_then(|close| {
                parse_attr_set(&text[..=close], out[i].span.start)
                    .map(|attrs| (close + 1, attrs, text[close + 1..].to_string()))
            })
        } else {
            None
        };
        let Some((consumed, attrs, rest)) = parsed else {
            i += 1;
            continue;
        };
        let text_span = out[i].span;
        let brace_end = (text_span.start + consumed).min(text_span.end);
        let prev = &mut out[i - 1];
        prev.attrs.items.extend(attrs.items);
        prev.attrs.span = attrs.span;
        prev.span = prev.span.union(Span::new(text_span.start, brace_end));
        if rest.is_empty() {
            out.remove(i);
        } else {
            out[i].kind = InlineKind::Text(rest);
            out[i].span = Span::new(brace_end, text_span.end);
            i += 1;
        }
    }
}

fn count_run(bytes: &[u8], start: usize, end: usize, needle: u8) -> usize {
    let mut i = start;
    while i < end && bytes[i] == needle {
        i += 1;
    }
    i - start
}

fn find_bracket_end(bytes: &[u8], start: usize, end: usize) -> Option<(usize, bool)> {
    let mut i = start;
    let mut depth = 0usize;
    let mut escaped = false;
    let mut had_newline = false;
    while i < end {
        let b = bytes[i];
        if b == b'\n' {
            had_newline = true;
        }
        if escaped {
            escaped = false;
            i += 1;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'[' => depth += 1,
            b']' => {
                if depth == 0 {
                    return Some((i, had_newline));
                }
                depth -= 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Matching `}` for an attribute set starting at `{`, skipping quoted values.
fn find_attr_end(bytes: &[u8], start: usize, end: usize) -> Option<usize> {
    let mut in_quotes = false;
    let mut i = start + 1;
    while i < end {
        match bytes[i] {
            b'"' => in_quotes = !in_quotes,
            b'}' if !in_quotes => return Some(i),
            b'\n' => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

/// `{=html}` after a closing backtick run.
fn parse_raw_format(buffer: &str, start: usize, end: usize) -> Option<(String, usize)> {
    let bytes = buffer.as_bytes();
    if start + 2 >= end || bytes[start] != b'{' || bytes[start + 1] != b'=' {
        return None;
    }
    let mut i = start + 2;
    while i < end && bytes[i] != b'}' {
        if !(bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'-')) {
            return None;
        }
        i += 1;
    }
    if i >= end || i == start + 2 {
        return None;
    }
    Some((buffer[start + 2..i].to_string(), i + 1))
}

fn parse_link_title(bytes: &[u8], start: usize, end: usize) -> Option<(String, usize)> {
    if start >= end {
        return None;
    }
    let close = match bytes[start] {
        b'"' => b'"',
        b'\'' => b'\'',
        _ => return None,
    };
    let mut i = start + 1;
    let mut out = Vec::new();
    let mut escaped = false;
    while i < end {
        let b = bytes[i];
        if b == b'\n' {
            return None;
        }
        if escaped {
            out.push(b);
            escaped = false;
            i += 1;
            continue;
        }
        if b == b'\\' && i + 1 < end && bytes[i + 1].is_ascii_punctuation() {
            escaped = true;
            i += 1;
            continue;
        }
        if b == close {
            let title = String::from_utf8_lossy(&out).to_string();
            return Some((title, i + 1));
        }
        out.push(b);
        i += 1;
    }
    None
}

fn parse_inline_link_destination(
    buffer: &str,
    start: usize,
    end: usize,
) -> Option<(String, Option<String>, usize)> {
    let bytes = buffer.as_bytes();
    let mut i = start;
    if i >= end || bytes[i] != b'(' {
        return None;
    }
    i += 1;
    while i < end && bytes[i].is_ascii_whitespace() {
        if bytes[i] == b'\n' {
            return None;
        }
        i += 1;
    }
    if i >= end {
        return None;
    }

    let mut url_bytes = Vec::new();
    let mut depth = 0usize;
    while i < end {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            break;
        }
        if b == b'\\' && i + 1 < end && bytes[i + 1].is_ascii_punctuation() {
            url_bytes.push(bytes[i + 1]);
            i += 2;
            continue;
        }
        match b {
            b'(' => {
                depth += 1;
                url_bytes.push(b);
            }
            b')' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                url_bytes.push(b);
            }
            _ => url_bytes.push(b),
        }
        i += 1;
    }
    if depth > 0 {
        return None;
    }
    let url = String::from_utf8_lossy(&url_bytes).to_string();

    let mut had_space = false;
    while i < end && bytes[i].is_ascii_whitespace() {
        had_space = true;
        i += 1;
    }
    if i >= end {
        return None;
    }
    if bytes[i] == b')' {
        return Some((url, None, i));
    }
    if !had_space {
        return None;
    }
    let (title, next) = parse_link_title(bytes, i, end)?;
    i = next;
    while i < end && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i < end && bytes[i] == b')' {
        return Some((url, Some(title), i));
    }
    None
}

/// Concatenated text content of a sequence, used for collapsed reference
/// labels (`[text][]`).
pub(crate) fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match &inline.kind {
            InlineKind::Text(text) | InlineKind::Verbatim(text) | InlineKind::Symbol(text) => {
                out.push_str(text)
            }
            InlineKind::Emph(children)
            | InlineKind::Strong(children)
            | InlineKind::Subscript(children)
            | InlineKind::Superscript(children)
            | InlineKind::Span(children)
            | InlineKind::Link { children, .. }
            | InlineKind::LinkRef { children, .. } => out.push_str(&plain_text(children)),
            InlineKind::Image { alt, .. } | InlineKind::ImageRef { alt, .. } => {
                out.push_str(&plain_text(alt))
            }
            InlineKind::SoftBreak | InlineKind::HardBreak => out.push(' '),
            InlineKind::RawInline { .. } | InlineKind::FootnoteRef { .. } => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::parse_inline_buffer;
    use crate::ast::{InlineKind, InlineSeq};

    fn parse_inline(text: &str) -> InlineSeq {
        let offsets: Vec<usize> = (0..text.len()).collect();
        parse_inline_buffer(text, &offsets, text.len())
    }

    #[test]
    fn lone_delimiter_stays_literal() {
        let out = parse_inline("*foo");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].kind, InlineKind::Text("*".to_string()));
        assert_eq!(out[1].kind, InlineKind::Text("foo".to_string()));
    }

    #[test]
    fn star_is_strong_and_underscore_is_emphasis() {
        let out = parse_inline("_a_ *b*");
        assert!(matches!(out[0].kind, InlineKind::Emph(_)));
        assert!(matches!(out[2].kind, InlineKind::Strong(_)));
    }

    #[test]
    fn verbatim_swallows_markup() {
        let out = parse_inline("`*not strong*`");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, InlineKind::Verbatim("*not strong*".to_string()));
    }

    #[test]
    fn raw_inline_keeps_its_format() {
        let out = parse_inline("`<b>`{=html}");
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].kind,
            InlineKind::RawInline {
                format: "html".to_string(),
                text: "<b>".to_string(),
            }
        );
    }

    #[test]
    fn reference_brackets_stay_unresolved() {
        let out = parse_inline("[bar][foo]");
        assert_eq!(out.len(), 1);
        let InlineKind::LinkRef { label, children, meta } = &out[0].kind else {
            panic!("expected a link reference");
        };
        assert_eq!(label, "foo");
        assert_eq!(children.len(), 1);
        assert!(meta.explicit_label);
    }

    #[test]
    fn collapsed_reference_uses_its_text_as_label() {
        let out = parse_inline("[foo][]");
        let InlineKind::LinkRef { label, meta, .. } = &out[0].kind else {
            panic!("expected a link reference");
        };
        assert_eq!(label, "foo");
        assert!(!meta.explicit_label);
    }

    #[test]
    fn bracketed_span_takes_attributes() {
        let out = parse_inline("[hi]{.wide}");
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0].kind, InlineKind::Span(_)));
        assert_eq!(out[0].attrs.get("class"), Some("wide"));
    }

    #[test]
    fn emphasis_takes_trailing_attributes() {
        let out = parse_inline("_x_{.c} tail");
        assert!(matches!(out[0].kind, InlineKind::Emph(_)));
        assert_eq!(out[0].attrs.get("class"), Some("c"));
        assert_eq!(out[1].kind, InlineKind::Text(" tail".to_string()));
    }

    #[test]
    fn braces_after_plain_text_stay_literal() {
        let out = parse_inline("a {.c}");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, InlineKind::Text("a {.c}".to_string()));
    }

    #[test]
    fn backslash_newline_is_a_hard_break() {
        let out = parse_inline("a\\\nb");
        assert!(matches!(out[1].kind, InlineKind::HardBreak));
    }
}
