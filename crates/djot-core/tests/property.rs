//! Randomized robustness checks: the compiler must never panic, and every
//! span it reports must stay inside the source it was given.

use std::panic;

use djot_core::{Block, BlockKind, HtmlOptions, Inline, InlineKind, compile, parse_document};

const CASES: usize = 200;
const MAX_LEN: usize = 512;

const CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyz \n\t#@*`$[](){}!<>:+-_=./\\^~|\"";

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Lcg { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        self.state
    }

    fn gen_range(&mut self, bound: usize) -> usize {
        (self.next() >> 33) as usize % bound
    }
}

fn random_source(rng: &mut Lcg) -> String {
    let len = rng.gen_range(MAX_LEN) + 1;
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        out.push(CHARSET[rng.gen_range(CHARSET.len())] as char);
    }
    out
}

#[test]
fn random_input_never_panics() {
    let mut rng = Lcg::new(0x5eed);
    for case in 0..CASES {
        let source = random_source(&mut rng);
        let result = panic::catch_unwind(|| compile(&source, &HtmlOptions::default()));
        assert!(result.is_ok(), "panicked on case {case}: {source:?}");
    }
}

#[test]
fn spans_stay_inside_the_source() {
    let mut rng = Lcg::new(0xbeef);
    for case in 0..CASES {
        let source = random_source(&mut rng);
        let (document, _) = parse_document(&source);
        let len = source.len();
        check_block_seq(&document.blocks, len, case, &source);
        for def in &document.footnotes {
            check_block_seq(&def.blocks, len, case, &source);
        }
    }
}

fn check_block_seq(blocks: &[Block], len: usize, case: usize, source: &str) {
    for block in blocks {
        assert!(
            block.span.start <= block.span.end && block.span.end <= len,
            "block span {:?} out of bounds on case {case}: {source:?}",
            block.span
        );
        match &block.kind {
            BlockKind::Paragraph { content } | BlockKind::Heading { content, .. } => {
                check_inline_seq(content, len, case, source);
            }
            BlockKind::BlockQuote { blocks } | BlockKind::Div { blocks } => {
                check_block_seq(blocks, len, case, source);
            }
            BlockKind::List(list) => {
                for item in &list.items {
                    check_block_seq(&item.blocks, len, case, source);
                }
            }
            BlockKind::Table(table) => {
                for row in table.head.iter().chain(table.body.iter()) {
                    for cell in &row.cells {
                        check_inline_seq(cell, len, case, source);
                    }
                }
            }
            BlockKind::CodeBlock { .. } | BlockKind::RawBlock { .. } | BlockKind::ThematicBreak => {
            }
        }
    }
}

fn check_inline_seq(inlines: &[Inline], len: usize, case: usize, source: &str) {
    for inline in inlines {
        assert!(
            inline.span.start <= inline.span.end && inline.span.end <= len,
            "inline span {:?} out of bounds on case {case}: {source:?}",
            inline.span
        );
        match &inline.kind {
            InlineKind::Emph(children)
            | InlineKind::Strong(children)
            | InlineKind::Subscript(children)
            | InlineKind::Superscript(children)
            | InlineKind::Span(children)
            | InlineKind::Link { children, .. }
            | InlineKind::LinkRef { children, .. } => {
                check_inline_seq(children, len, case, source);
            }
            InlineKind::Image { alt, .. } | InlineKind::ImageRef { alt, .. } => {
                check_inline_seq(alt, len, case, source);
            }
            _ => {}
        }
    }
}
