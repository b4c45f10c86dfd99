use djot_core::{HtmlOptions, compile, parse_document, render_html_sanitized};

#[test]
fn wrap_document_adds_an_article_shell() {
    let options = HtmlOptions {
        wrap_document: true,
        ..HtmlOptions::default()
    };
    assert_eq!(
        compile("hi\n", &options).html,
        "<article class=\"djot\">\n  <p>hi</p>\n</article>"
    );
}

#[test]
fn disabling_tight_lists_forces_loose_rendering() {
    let options = HtmlOptions {
        tight_lists: false,
        ..HtmlOptions::default()
    };
    assert_eq!(
        compile("- a\n- b\n", &options).html,
        "<ul>\n  <li>\n    <p>a</p>\n  </li>\n  <li>\n    <p>b</p>\n  </li>\n</ul>"
    );
}

#[test]
fn the_attribute_allowlist_filters_rendered_attributes() {
    let options = HtmlOptions {
        attribute_allowlist: Some(vec!["id".to_string()]),
        ..HtmlOptions::default()
    };
    let result = compile("{#intro .lead}\npara\n", &options);
    assert_eq!(result.html, "<p id=\"intro\">para</p>");
}

#[test]
fn an_empty_allowlist_drops_all_attributes() {
    let options = HtmlOptions {
        attribute_allowlist: Some(Vec::new()),
        ..HtmlOptions::default()
    };
    let result = compile("{#intro .lead}\npara\n", &options);
    assert_eq!(result.html, "<p>para</p>");
}

#[test]
fn sanitized_rendering_strips_raw_script() {
    let source = "```=html\n<script>alert(1)</script><em>kept</em>\n```\n";
    let (document, _) = parse_document(source);
    let clean = render_html_sanitized(&document, &HtmlOptions::default());
    assert!(!clean.contains("script"));
    assert!(clean.contains("<em>kept</em>"));
}

#[test]
fn sanitized_rendering_keeps_ordinary_markup() {
    let (document, warnings) = parse_document("# Title\n\n_soft_ text\n");
    assert!(warnings.is_empty());
    let clean = render_html_sanitized(&document, &HtmlOptions::default());
    assert!(clean.contains("<h1>Title</h1>"));
    assert!(clean.contains("<em>soft</em>"));
}
