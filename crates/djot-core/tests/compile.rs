use djot_core::{HtmlOptions, WarningKind, compile, compile_bytes};

fn html(source: &str) -> String {
    compile(source, &HtmlOptions::default()).html
}

#[test]
fn compilation_is_deterministic() {
    let source = "# Title\n\nSome _text_ with a [link](https://example.com).\n";
    let first = compile(source, &HtmlOptions::default());
    let second = compile(source, &HtmlOptions::default());
    assert_eq!(first, second);
}

#[test]
fn a_heading_renders_at_its_level() {
    assert_eq!(html("# hi\n"), "<h1>hi</h1>");
    assert_eq!(html("### deep\n"), "<h3>deep</h3>");
}

#[test]
fn output_has_no_trailing_newline() {
    assert!(!html("# hi\n").ends_with('\n'));
    assert!(!html("one\n\ntwo\n").ends_with('\n'));
}

#[test]
fn unmatched_delimiters_stay_literal() {
    assert_eq!(html("*foo\n"), "<p>*foo</p>");
    assert_eq!(html("foo_\n"), "<p>foo_</p>");
}

#[test]
fn markup_characters_are_escaped_everywhere() {
    assert_eq!(
        html("5 < 6 & \"quoted\"\n"),
        "<p>5 &lt; 6 &amp; &quot;quoted&quot;</p>"
    );
    let result = compile("{title=\"a<b\"}\npara\n", &HtmlOptions::default());
    assert_eq!(result.html, "<p title=\"a&lt;b\">para</p>");
}

#[test]
fn defined_references_resolve_without_warnings() {
    let source = "[bar][foo]\n\n[foo]: http://example.com\n";
    let result = compile(source, &HtmlOptions::default());
    assert_eq!(
        result.html,
        "<p><a href=\"http://example.com\">bar</a></p>"
    );
    assert!(result.warnings.is_empty());
}

#[test]
fn dangling_references_render_literally_with_one_warning() {
    let result = compile("[bar][foo]\n", &HtmlOptions::default());
    assert_eq!(result.html, "<p>[bar][foo]</p>");
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind, WarningKind::DanglingReference);
    assert_eq!(result.warnings[0].range.start.line, 0);
}

#[test]
fn tight_and_loose_lists_differ() {
    assert_eq!(html("- a\n- b\n"), "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>");
    assert_eq!(
        html("- a\n\n- b\n"),
        "<ul>\n  <li>\n    <p>a</p>\n  </li>\n  <li>\n    <p>b</p>\n  </li>\n</ul>"
    );
}

#[test]
fn an_unclosed_fence_warns_and_keeps_its_content() {
    let result = compile("```\nlet x = 1;\n", &HtmlOptions::default());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind, WarningKind::UnclosedFence);
    assert!(result.html.contains("let x = 1;"));
}

#[test]
fn raw_blocks_pass_through_only_for_html() {
    assert_eq!(html("```=html\n<aside>x</aside>\n```\n"), "<aside>x</aside>");
    assert_eq!(html("```=tex\n\\par\n```\n"), "");
}

#[test]
fn verbatim_protects_markup() {
    assert_eq!(html("`*x*`\n"), "<p><code>*x*</code></p>");
}

#[test]
fn invalid_utf8_is_the_only_hard_error() {
    assert!(compile_bytes(&[0xff, 0xfe], &HtmlOptions::default()).is_err());
    let ok = compile_bytes("# hi\n".as_bytes(), &HtmlOptions::default()).unwrap();
    assert_eq!(ok.html, "<h1>hi</h1>");
}

#[test]
fn a_short_div_closer_stays_inside_the_container() {
    let result = compile("::::: note\ninside\n:::\nafter\n", &HtmlOptions::default());
    assert_eq!(
        result.html,
        "<div class=\"note\">\n  <p>inside</p>\n  <div>\n    <p>after</p>\n  </div>\n</div>"
    );
}

#[test]
fn footnotes_collect_into_an_end_section() {
    let result = compile("Here[^a].\n\n[^a]: The note.\n", &HtmlOptions::default());
    assert!(result.warnings.is_empty());
    assert!(result.html.contains("<a id=\"fnref-a\" href=\"#fn-a\" class=\"footnote-ref\"><sup>1</sup></a>"));
    assert!(result.html.contains("<section class=\"footnotes\">"));
    assert!(result.html.contains("<li id=\"fn-a\">"));
}

#[test]
fn duplicate_definitions_warn_and_keep_the_first() {
    let source = "[x][a]\n\n[a]: http://one\n\n[a]: http://two\n";
    let result = compile(source, &HtmlOptions::default());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(
        result.warnings[0].kind,
        WarningKind::DuplicateReferenceLabel
    );
    assert!(result.html.contains("href=\"http://one\""));
}
