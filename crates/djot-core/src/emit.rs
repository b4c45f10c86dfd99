//! HTML rendering. Deterministic formatting: 2-space indentation, LF
//! newlines, and no trailing newline on the finished document.

use std::collections::{HashMap, HashSet};

use ammonia::Builder;
use once_cell::sync::Lazy;

use crate::ast::{
    Alignment, AttrSet, Block, BlockKind, Document, FootnoteDef, Inline, InlineKind, List,
    ListKind, Table,
};

/// Target output format. Only HTML is implemented; the enum exists so a
/// caller selecting the format does not change signature when more are
/// added.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum OutputFormat {
    #[default]
    Html,
}

#[derive(Clone, Debug)]
pub struct HtmlOptions {
    pub format: OutputFormat,
    /// Wrap the output in `<article class="djot">`.
    pub wrap_document: bool,
    /// When false, every list renders loose regardless of source spacing.
    pub tight_lists: bool,
    /// When set, only attribute names on the list are emitted; `None` keeps
    /// everything.
    pub attribute_allowlist: Option<Vec<String>>,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Html,
            wrap_document: false,
            tight_lists: true,
            attribute_allowlist: None,
        }
    }
}

/// Renders a resolved document. Pure: the AST is not modified and no
/// diagnostics are produced here.
pub fn render_html(document: &Document, options: &HtmlOptions) -> String {
    let OutputFormat::Html = options.format;
    let mut writer = HtmlWriter::new();
    let renderer = Renderer { document, options };
    if options.wrap_document {
        writer.line("<article class=\"djot\">");
        writer.indent += 1;
    }
    for block in &document.blocks {
        renderer.emit_block(&mut writer, block);
    }
    renderer.emit_footnote_section(&mut writer);
    if options.wrap_document {
        writer.indent -= 1;
        writer.line("</article>");
    }
    writer.finish()
}

static SAFE_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "abbr", "article", "b", "blockquote", "br", "code", "dd", "div", "dl", "dt", "em",
        "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "li", "ol", "p", "pre", "s",
        "section", "span", "strong", "sub", "sup", "table", "tbody", "td", "th", "thead", "tr",
        "u", "ul",
    ]
    .into_iter()
    .collect()
});

static SAFE_TAG_ATTRIBUTES: Lazy<HashMap<&'static str, HashSet<&'static str>>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("a", ["href", "title"].into_iter().collect());
    map.insert("img", ["alt", "src", "title"].into_iter().collect());
    map.insert("ol", ["start"].into_iter().collect());
    map.insert("td", ["style"].into_iter().collect());
    map.insert("th", ["style"].into_iter().collect());
    map
});

/// Renders and then sanitizes against a fixed allow-list, for callers that
/// feed untrusted input straight to a page.
pub fn render_html_sanitized(document: &Document, options: &HtmlOptions) -> String {
    let raw = render_html(document, options);
    let generic: HashSet<&str> = ["class", "id"].into_iter().collect();
    Builder::new()
        .tags(SAFE_TAGS.clone())
        .generic_attributes(generic)
        .tag_attributes(SAFE_TAG_ATTRIBUTES.clone())
        .clean(&raw)
        .to_string()
}

struct HtmlWriter {
    out: String,
    indent: usize,
}

impl HtmlWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn finish(mut self) -> String {
        if self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out
    }
}

struct Renderer<'a> {
    document: &'a Document,
    options: &'a HtmlOptions,
}

impl Renderer<'_> {
    fn emit_block(&self, writer: &mut HtmlWriter, block: &Block) {
        let attrs = self.attr_string(&block.attrs);
        match &block.kind {
            BlockKind::Paragraph { content } => {
                writer.line(&format!("<p{}>{}</p>", attrs, self.render_inlines(content)));
            }
            BlockKind::Heading { level, content } => {
                let level = (*level).clamp(1, 6);
                writer.line(&format!(
                    "<h{level}{attrs}>{}</h{level}>",
                    self.render_inlines(content)
                ));
            }
            BlockKind::CodeBlock { lang, text } => {
                let class = match lang {
                    Some(lang) => format!(" class=\"language-{}\"", escape_html(lang)),
                    None => String::new(),
                };
                // Unindented on purpose so code content survives verbatim.
                writer.out.push_str(&format!("<pre><code{class}>"));
                writer.out.push_str(&escape_html(text));
                if !text.is_empty() {
                    writer.out.push('\n');
                }
                writer.out.push_str("</code></pre>\n");
            }
            BlockKind::RawBlock { format, text } => {
                if format == "html" {
                    writer.out.push_str(text);
                    writer.out.push('\n');
                }
            }
            BlockKind::BlockQuote { blocks } => {
                writer.line(&format!("<blockquote{attrs}>"));
                writer.indent += 1;
                for child in blocks {
                    self.emit_block(writer, child);
                }
                writer.indent -= 1;
                writer.line("</blockquote>");
            }
            BlockKind::List(list) => self.emit_list(writer, list, &attrs),
            BlockKind::ThematicBreak => {
                writer.line(&format!("<hr{attrs} />"));
            }
            BlockKind::Table(table) => self.emit_table(writer, table, &attrs),
            BlockKind::Div { blocks } => {
                writer.line(&format!("<div{attrs}>"));
                writer.indent += 1;
                for child in blocks {
                    self.emit_block(writer, child);
                }
                writer.indent -= 1;
                writer.line("</div>");
            }
        }
    }

    fn emit_list(&self, writer: &mut HtmlWriter, list: &List, attrs: &str) {
        if list.kind == ListKind::Definition {
            self.emit_definition_list(writer, list, attrs);
            return;
        }
        let tag = match list.kind {
            ListKind::Ordered => "ol",
            _ => "ul",
        };
        let start_attr = match (list.kind, list.start) {
            (ListKind::Ordered, Some(start)) => format!(" start=\"{start}\""),
            _ => String::new(),
        };
        let tight = list.tight && self.options.tight_lists;
        writer.line(&format!("<{tag}{attrs}{start_attr}>"));
        writer.indent += 1;
        for item in &list.items {
            let li_attrs = match item.checkbox {
                Some(true) => " class=\"checked\"",
                Some(false) => " class=\"unchecked\"",
                None => "",
            };
            // A tight item holding a single paragraph flattens: the inlines
            // land directly inside the `<li>`.
            if tight && item.blocks.len() == 1
                && let BlockKind::Paragraph { content } = &item.blocks[0].kind
            {
                writer.line(&format!(
                    "<li{li_attrs}>{}</li>",
                    self.render_inlines(content)
                ));
                continue;
            }
            writer.line(&format!("<li{li_attrs}>"));
            writer.indent += 1;
            for child in &item.blocks {
                self.emit_block(writer, child);
            }
            writer.indent -= 1;
            writer.line("</li>");
        }
        writer.indent -= 1;
        writer.line(&format!("</{tag}>"));
    }

    /// `<dl>`: the first block of each item is the term, the rest its
    /// definition.
    fn emit_definition_list(&self, writer: &mut HtmlWriter, list: &List, attrs: &str) {
        writer.line(&format!("<dl{attrs}>"));
        writer.indent += 1;
        for item in &list.items {
            let mut blocks = item.blocks.iter();
            match blocks.next() {
                Some(Block {
                    kind: BlockKind::Paragraph { content },
                    ..
                }) => {
                    writer.line(&format!("<dt>{}</dt>", self.render_inlines(content)));
                }
                Some(other) => {
                    writer.line("<dt>");
                    writer.indent += 1;
                    self.emit_block(writer, other);
                    writer.indent -= 1;
                    writer.line("</dt>");
                }
                None => writer.line("<dt></dt>"),
            }
            writer.line("<dd>");
            writer.indent += 1;
            for child in blocks {
                self.emit_block(writer, child);
            }
            writer.indent -= 1;
            writer.line("</dd>");
        }
        writer.indent -= 1;
        writer.line("</dl>");
    }

    fn emit_table(&self, writer: &mut HtmlWriter, table: &Table, attrs: &str) {
        writer.line(&format!("<table{attrs}>"));
        writer.indent += 1;
        if !table.head.is_empty() {
            writer.line("<thead>");
            writer.indent += 1;
            for row in &table.head {
                self.emit_table_row(writer, table, row, "th");
            }
            writer.indent -= 1;
            writer.line("</thead>");
        }
        if !table.body.is_empty() {
            writer.line("<tbody>");
            writer.indent += 1;
            for row in &table.body {
                self.emit_table_row(writer, table, row, "td");
            }
            writer.indent -= 1;
            writer.line("</tbody>");
        }
        writer.indent -= 1;
        writer.line("</table>");
    }

    fn emit_table_row(
        &self,
        writer: &mut HtmlWriter,
        table: &Table,
        row: &crate::ast::TableRow,
        tag: &str,
    ) {
        writer.line("<tr>");
        writer.indent += 1;
        for (idx, cell) in row.cells.iter().enumerate() {
            let style = match table.aligns.get(idx).copied().unwrap_or(Alignment::Default) {
                Alignment::Default => "",
                Alignment::Left => " style=\"text-align: left;\"",
                Alignment::Center => " style=\"text-align: center;\"",
                Alignment::Right => " style=\"text-align: right;\"",
            };
            writer.line(&format!(
                "<{tag}{style}>{}</{tag}>",
                self.render_inlines(cell)
            ));
        }
        writer.indent -= 1;
        writer.line("</tr>");
    }

    fn emit_footnote_section(&self, writer: &mut HtmlWriter) {
        if self.document.footnote_order.is_empty() {
            return;
        }
        writer.line("<section class=\"footnotes\">");
        writer.indent += 1;
        writer.line("<hr />");
        writer.line("<ol>");
        writer.indent += 1;
        for label in &self.document.footnote_order {
            let Some(def) = self
                .document
                .footnotes
                .iter()
                .find(|def| &def.label == label)
            else {
                continue;
            };
            self.emit_footnote(writer, def);
        }
        writer.indent -= 1;
        writer.line("</ol>");
        writer.indent -= 1;
        writer.line("</section>");
    }

    fn emit_footnote(&self, writer: &mut HtmlWriter, def: &FootnoteDef) {
        let label = escape_html(&def.label);
        writer.line(&format!("<li id=\"fn-{label}\">"));
        writer.indent += 1;
        let back = format!("<a href=\"#fnref-{label}\" class=\"footnote-back\">\u{21a9}\u{fe0e}</a>");
        // The back link rides inside the last paragraph when there is one.
        let (init, last_para) = match def.blocks.split_last() {
            Some((
                Block {
                    kind: BlockKind::Paragraph { content },
                    ..
                },
                init,
            )) => (init, Some(content)),
            _ => (def.blocks.as_slice(), None),
        };
        for block in init {
            self.emit_block(writer, block);
        }
        match last_para {
            Some(content) => {
                writer.line(&format!("<p>{}{back}</p>", self.render_inlines(content)));
            }
            None => writer.line(&format!("<p>{back}</p>")),
        }
        writer.indent -= 1;
        writer.line("</li>");
    }

    fn render_inlines(&self, inlines: &[Inline]) -> String {
        let mut out = String::new();
        for inline in inlines {
            let attrs = self.attr_string(&inline.attrs);
            match &inline.kind {
                InlineKind::Text(text) => out.push_str(&escape_html(text)),
                InlineKind::Emph(children) => {
                    out.push_str(&format!("<em{attrs}>"));
                    out.push_str(&self.render_inlines(children));
                    out.push_str("</em>");
                }
                InlineKind::Strong(children) => {
                    out.push_str(&format!("<strong{attrs}>"));
                    out.push_str(&self.render_inlines(children));
                    out.push_str("</strong>");
                }
                InlineKind::Subscript(children) => {
                    out.push_str(&format!("<sub{attrs}>"));
                    out.push_str(&self.render_inlines(children));
                    out.push_str("</sub>");
                }
                InlineKind::Superscript(children) => {
                    out.push_str(&format!("<sup{attrs}>"));
                    out.push_str(&self.render_inlines(children));
                    out.push_str("</sup>");
                }
                InlineKind::Span(children) => {
                    out.push_str(&format!("<span{attrs}>"));
                    out.push_str(&self.render_inlines(children));
                    out.push_str("</span>");
                }
                InlineKind::Verbatim(text) => {
                    out.push_str(&format!("<code{attrs}>"));
                    out.push_str(&escape_html(text));
                    out.push_str("</code>");
                }
                InlineKind::RawInline { format, text } => {
                    if format == "html" {
                        out.push_str(text);
                    }
                }
                InlineKind::Link {
                    url,
                    title,
                    children,
                } => {
                    out.push_str("<a href=\"");
                    out.push_str(&escape_url_attr(url));
                    out.push('"');
                    if let Some(title) = title {
                        out.push_str(" title=\"");
                        out.push_str(&escape_html(title));
                        out.push('"');
                    }
                    out.push_str(&attrs);
                    out.push('>');
                    out.push_str(&self.render_inlines(children));
                    out.push_str("</a>");
                }
                InlineKind::Image { url, title, alt } => {
                    out.push_str("<img src=\"");
                    out.push_str(&escape_url_attr(url));
                    out.push_str("\" alt=\"");
                    out.push_str(&escape_html(&plain_alt(alt)));
                    out.push('"');
                    if let Some(title) = title {
                        out.push_str(" title=\"");
                        out.push_str(&escape_html(title));
                        out.push('"');
                    }
                    out.push_str(&attrs);
                    out.push_str(" />");
                }
                // Unresolved references only reach the renderer when a caller
                // skips the resolver; render them back as written.
                InlineKind::LinkRef {
                    label,
                    children,
                    meta,
                } => {
                    out.push('[');
                    out.push_str(&self.render_inlines(children));
                    out.push(']');
                    out.push('[');
                    if meta.explicit_label {
                        out.push_str(&escape_html(label));
                    }
                    out.push(']');
                }
                InlineKind::ImageRef { label, alt, meta } => {
                    out.push_str("![");
                    out.push_str(&self.render_inlines(alt));
                    out.push(']');
                    out.push('[');
                    if meta.explicit_label {
                        out.push_str(&escape_html(label));
                    }
                    out.push(']');
                }
                InlineKind::Symbol(name) => {
                    out.push_str("<span class=\"symbol\">");
                    out.push_str(&escape_html(name));
                    out.push_str("</span>");
                }
                InlineKind::FootnoteRef { label, index } => match index {
                    Some(index) => {
                        let label = escape_html(label);
                        out.push_str(&format!(
                            "<a id=\"fnref-{label}\" href=\"#fn-{label}\" class=\"footnote-ref\"><sup>{index}</sup></a>"
                        ));
                    }
                    None => out.push_str(&escape_html(&format!("[^{label}]"))),
                },
                InlineKind::SoftBreak => out.push(' '),
                InlineKind::HardBreak => out.push_str("<br />"),
            }
        }
        out
    }

    fn attr_string(&self, attrs: &AttrSet) -> String {
        let mut out = String::new();
        for item in &attrs.items {
            if let Some(allow) = &self.options.attribute_allowlist
                && !allow.iter().any(|key| key == &item.key)
            {
                continue;
            }
            out.push_str(&format!(
                " {}=\"{}\"",
                item.key,
                escape_html(&item.value)
            ));
        }
        out
    }
}

/// Alt text is flat: nested markup reduces to its text content.
fn plain_alt(inlines: &[Inline]) -> String {
    crate::inline::plain_text(inlines)
}

/// `&`, `<`, `>` and `"` are escaped everywhere, attribute values included.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_url_attr(text: &str) -> String {
    let mut encoded = String::new();
    for &byte in text.as_bytes() {
        match byte {
            b' ' => encoded.push_str("%20"),
            b'\\' => encoded.push_str("%5C"),
            0x00..=0x1F | 0x7F..=0xFF => {
                encoded.push_str(&format!("%{byte:02X}"));
            }
            _ => encoded.push(byte as char),
        }
    }
    escape_html(&encoded)
}

#[cfg(test)]
mod tests {
    use super::escape_html;

    #[test]
    fn quotes_are_escaped_in_text_content() {
        assert_eq!(
            escape_html("a \"b\" <c> & d"),
            "a &quot;b&quot; &lt;c&gt; &amp; d"
        );
    }
}
