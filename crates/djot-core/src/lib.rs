//! A djot-to-HTML compiler.
//!
//! Compilation is a fixed pipeline with no feedback between stages: block
//! scanning, inline scanning, reference resolution, HTML rendering. Parsing
//! is tolerant; unrecognized syntax degrades to literal text and recoverable
//! problems come back as [`Warning`] values next to the rendered output.
//!
//! ```
//! use djot_core::{compile, HtmlOptions};
//!
//! let result = compile("# hi\n", &HtmlOptions::default());
//! assert_eq!(result.html, "<h1>hi</h1>");
//! assert!(result.warnings.is_empty());
//! ```

mod ast;
mod attr;
mod block;
mod emit;
mod inline;
mod resolve;
mod source_map;
mod span;
mod warning;

use thiserror::Error;

pub use ast::{
    Alignment, Attr, AttrSet, Block, BlockKind, Document, FootnoteDef, Inline, InlineKind,
    InlineSeq, LinkDefinition, List, ListItem, ListKind, RefMeta, Table, TableRow,
};
pub use emit::{HtmlOptions, OutputFormat, render_html, render_html_sanitized};
pub use source_map::{Position, Range, SourceMap};
pub use span::Span;
pub use warning::{Warning, WarningKind};

/// Output of a compilation: the rendered document plus everything that went
/// wrong along the way. There is no success flag; an empty warning list is
/// the success case.
#[derive(Clone, Debug, PartialEq)]
pub struct Compiled {
    pub html: String,
    pub warnings: Vec<Warning>,
}

/// The only hard failure: input that is not valid UTF-8. Everything past
/// that boundary is recoverable.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("input is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Compiles djot source to HTML. Infallible: malformed constructs render as
/// literal text and recoverable problems are reported as warnings.
pub fn compile(source: &str, options: &HtmlOptions) -> Compiled {
    let parsed = block::parse(source);
    let mut document = parsed.document;
    let mut warnings = parsed.warnings;
    resolve::resolve(&mut document, &parsed.source_map, &mut warnings);
    let html = render_html(&document, options);
    Compiled { html, warnings }
}

/// Like [`compile`] for raw bytes; the UTF-8 check is the one place a hard
/// error can surface.
pub fn compile_bytes(source: &[u8], options: &HtmlOptions) -> Result<Compiled, CompileError> {
    let source = std::str::from_utf8(source)?;
    Ok(compile(source, options))
}

/// Parses and resolves without rendering, for callers that want the tree.
pub fn parse_document(source: &str) -> (Document, Vec<Warning>) {
    let parsed = block::parse(source);
    let mut document = parsed.document;
    let mut warnings = parsed.warnings;
    resolve::resolve(&mut document, &parsed.source_map, &mut warnings);
    (document, warnings)
}
