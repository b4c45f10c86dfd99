//! Reference resolution. Runs after block and inline scanning and rewrites
//! the tree in place: reference links become plain links, dangling references
//! fall back to their literal bracket text, and footnote references get
//! numbers in first-use order.

use std::collections::HashMap;

use crate::ast::{
    Attr, AttrSet, Block, BlockKind, Document, Inline, InlineKind, InlineSeq, LinkDefinition,
    RefMeta,
};
use crate::source_map::SourceMap;
use crate::span::Span;
use crate::warning::{Warning, WarningKind};

/// Case-folds and collapses internal whitespace so `[Foo]` and `[foo ]`
/// address the same definition.
pub(crate) fn normalize_link_label(label: &str) -> String {
    let mut out = String::new();
    let mut last_space = false;
    for ch in label.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !last_space {
                out.push(' ');
                last_space = true;
            }
            continue;
        }
        last_space = false;
        out.extend(ch.to_lowercase());
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

pub(crate) fn resolve(
    document: &mut Document,
    source_map: &SourceMap,
    warnings: &mut Vec<Warning>,
) {
    let defined: Vec<String> = document
        .footnotes
        .iter()
        .map(|def| def.label.clone())
        .collect();
    let mut order = Vec::new();
    {
        let mut resolver = Resolver {
            link_defs: &document.link_defs,
            defined_footnotes: &defined,
            order: &mut order,
            source_map,
            warnings,
        };
        let mut blocks = std::mem::take(&mut document.blocks);
        for block in &mut blocks {
            resolver.resolve_block(block);
        }
        document.blocks = blocks;

        let mut footnotes = std::mem::take(&mut document.footnotes);
        for def in &mut footnotes {
            for block in &mut def.blocks {
                resolver.resolve_block(block);
            }
        }
        document.footnotes = footnotes;
    }
    document.footnote_order = order;
}

struct Resolver<'a> {
    link_defs: &'a HashMap<String, LinkDefinition>,
    defined_footnotes: &'a [String],
    order: &'a mut Vec<String>,
    source_map: &'a SourceMap,
    warnings: &'a mut Vec<Warning>,
}

impl Resolver<'_> {
    fn resolve_block(&mut self, block: &mut Block) {
        merge_attrs(&mut block.attrs);
        match &mut block.kind {
            BlockKind::Paragraph { content } | BlockKind::Heading { content, .. } => {
                self.resolve_inlines(content);
            }
            BlockKind::BlockQuote { blocks } | BlockKind::Div { blocks } => {
                for child in blocks {
                    self.resolve_block(child);
                }
            }
            BlockKind::List(list) => {
                for item in &mut list.items {
                    for child in &mut item.blocks {
                        self.resolve_block(child);
                    }
                }
            }
            BlockKind::Table(table) => {
                for row in table.head.iter_mut().chain(table.body.iter_mut()) {
                    for cell in &mut row.cells {
                        self.resolve_inlines(cell);
                    }
                }
            }
            BlockKind::CodeBlock { .. } | BlockKind::RawBlock { .. } | BlockKind::ThematicBreak => {
            }
        }
    }

    fn resolve_inlines(&mut self, inlines: &mut InlineSeq) {
        let old = std::mem::take(inlines);
        for mut inline in old {
            merge_attrs(&mut inline.attrs);
            match inline.kind {
                InlineKind::LinkRef {
                    label,
                    mut children,
                    meta,
                } => {
                    self.resolve_inlines(&mut children);
                    match self.link_defs.get(&normalize_link_label(&label)) {
                        Some(def) => inlines.push(Inline {
                            span: inline.span,
                            attrs: inline.attrs,
                            kind: InlineKind::Link {
                                url: def.url.clone(),
                                title: def.title.clone(),
                                children,
                            },
                        }),
                        None => {
                            self.warn(
                                inline.span,
                                format!("undefined reference `{label}`"),
                            );
                            push_ref_fallback(inlines, "[", children, &label, &meta);
                        }
                    }
                }
                InlineKind::ImageRef {
                    label,
                    mut alt,
                    meta,
                } => {
                    self.resolve_inlines(&mut alt);
                    match self.link_defs.get(&normalize_link_label(&label)) {
                        Some(def) => inlines.push(Inline {
                            span: inline.span,
                            attrs: inline.attrs,
                            kind: InlineKind::Image {
                                url: def.url.clone(),
                                title: def.title.clone(),
                                alt,
                            },
                        }),
                        None => {
                            self.warn(
                                inline.span,
                                format!("undefined reference `{label}`"),
                            );
                            push_ref_fallback(inlines, "![", alt, &label, &meta);
                        }
                    }
                }
                InlineKind::FootnoteRef { label, .. } => {
                    if self.defined_footnotes.iter().any(|l| l == &label) {
                        let idx = match self.order.iter().position(|l| l == &label) {
                            Some(idx) => idx,
                            None => {
                                self.order.push(label.clone());
                                self.order.len() - 1
                            }
                        };
                        inlines.push(Inline {
                            span: inline.span,
                            attrs: inline.attrs,
                            kind: InlineKind::FootnoteRef {
                                label,
                                index: Some(idx + 1),
                            },
                        });
                    } else {
                        self.warn(inline.span, format!("undefined footnote `{label}`"));
                        inlines.push(Inline {
                            span: inline.span,
                            attrs: AttrSet::empty(),
                            kind: InlineKind::Text(format!("[^{label}]")),
                        });
                    }
                }
                InlineKind::Emph(mut children) => {
                    self.resolve_inlines(&mut children);
                    inline.kind = InlineKind::Emph(children);
                    inlines.push(inline);
                }
                InlineKind::Strong(mut children) => {
                    self.resolve_inlines(&mut children);
                    inline.kind = InlineKind::Strong(children);
                    inlines.push(inline);
                }
                InlineKind::Subscript(mut children) => {
                    self.resolve_inlines(&mut children);
                    inline.kind = InlineKind::Subscript(children);
                    inlines.push(inline);
                }
                InlineKind::Superscript(mut children) => {
                    self.resolve_inlines(&mut children);
                    inline.kind = InlineKind::Superscript(children);
                    inlines.push(inline);
                }
                InlineKind::Span(mut children) => {
                    self.resolve_inlines(&mut children);
                    inline.kind = InlineKind::Span(children);
                    inlines.push(inline);
                }
                InlineKind::Link {
                    url,
                    title,
                    mut children,
                } => {
                    self.resolve_inlines(&mut children);
                    inline.kind = InlineKind::Link {
                        url,
                        title,
                        children,
                    };
                    inlines.push(inline);
                }
                InlineKind::Image {
                    url,
                    title,
                    mut alt,
                } => {
                    self.resolve_inlines(&mut alt);
                    inline.kind = InlineKind::Image { url, title, alt };
                    inlines.push(inline);
                }
                other => {
                    inline.kind = other;
                    inlines.push(inline);
                }
            }
        }
    }

    fn warn(&mut self, span: Span, message: String) {
        let range = self.source_map.range(span);
        self.warnings
            .push(Warning::new(WarningKind::DanglingReference, range, message));
    }
}

/// Literal reconstruction of a dangling reference: the bracketed text stays
/// rendered, followed by `[label]` or `[]` exactly as written.
fn push_ref_fallback(
    out: &mut InlineSeq,
    opener: &str,
    children: InlineSeq,
    label: &str,
    meta: &RefMeta,
) {
    out.push(Inline {
        span: meta.opener_span,
        attrs: AttrSet::empty(),
        kind: InlineKind::Text(opener.to_string()),
    });
    out.extend(children);
    let suffix = if meta.explicit_label {
        format!("][{label}]")
    } else {
        "][]".to_string()
    };
    out.push(Inline {
        span: meta.closer_span,
        attrs: AttrSet::empty(),
        kind: InlineKind::Text(suffix),
    });
}

/// Duplicate attribute keys collapse: later values win, except `class`,
/// where values accumulate space-separated.
fn merge_attrs(attrs: &mut AttrSet) {
    if attrs.items.len() < 2 {
        return;
    }
    let items = std::mem::take(&mut attrs.items);
    let mut merged: Vec<Attr> = Vec::new();
    for item in items {
        if let Some(existing) = merged.iter_mut().find(|attr| attr.key == item.key) {
            if item.key == "class" {
                existing.value.push(' ');
                existing.value.push_str(&item.value);
            } else {
                existing.value = item.value;
            }
        } else {
            merged.push(item);
        }
    }
    attrs.items = merged;
}

#[cfg(test)]
mod tests {
    use super::{normalize_link_label, resolve};
    use crate::ast::{BlockKind, InlineKind};
    use crate::block;
    use crate::warning::WarningKind;

    fn resolved(source: &str) -> (crate::ast::Document, Vec<crate::warning::Warning>) {
        let result = block::parse(source);
        let mut document = result.document;
        let mut warnings = result.warnings;
        resolve(&mut document, &result.source_map, &mut warnings);
        (document, warnings)
    }

    #[test]
    fn labels_fold_case_and_whitespace() {
        assert_eq!(normalize_link_label("  Foo   Bar "), "foo bar");
        assert_eq!(normalize_link_label("FOO"), "foo");
    }

    #[test]
    fn defined_references_become_links() {
        let (document, warnings) = resolved("[bar][foo]\n\n[foo]: http://example.com\n");
        assert!(warnings.is_empty());
        let BlockKind::Paragraph { content } = &document.blocks[0].kind else {
            panic!("expected a paragraph");
        };
        let InlineKind::Link { url, .. } = &content[0].kind else {
            panic!("expected a link");
        };
        assert_eq!(url, "http://example.com");
    }

    #[test]
    fn dangling_references_degrade_to_text() {
        let (document, warnings) = resolved("[bar][foo]\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::DanglingReference);
        let BlockKind::Paragraph { content } = &document.blocks[0].kind else {
            panic!("expected a paragraph");
        };
        assert_eq!(content[0].kind, InlineKind::Text("[".to_string()));
        assert_eq!(content[1].kind, InlineKind::Text("bar".to_string()));
        assert_eq!(content[2].kind, InlineKind::Text("][foo]".to_string()));
    }

    #[test]
    fn footnotes_number_in_first_use_order() {
        let source = "a[^two] b[^one]\n\n[^one]: first\n\n[^two]: second\n";
        let (document, warnings) = resolved(source);
        assert!(warnings.is_empty());
        assert_eq!(document.footnote_order, vec!["two", "one"]);
        let BlockKind::Paragraph { content } = &document.blocks[0].kind else {
            panic!("expected a paragraph");
        };
        let indices: Vec<usize> = content
            .iter()
            .filter_map(|inline| match &inline.kind {
                InlineKind::FootnoteRef { index, .. } => *index,
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn undefined_footnotes_stay_literal() {
        let (document, warnings) = resolved("a[^missing]\n");
        assert_eq!(warnings.len(), 1);
        let BlockKind::Paragraph { content } = &document.blocks[0].kind else {
            panic!("expected a paragraph");
        };
        assert_eq!(content[1].kind, InlineKind::Text("[^missing]".to_string()));
    }
}
