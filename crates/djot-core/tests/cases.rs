//! Table-driven cases loaded from `tests/cases.json` at the workspace root.

use std::fs;
use std::path::Path;

use djot_core::{HtmlOptions, compile};
use serde::Deserialize;

#[derive(Deserialize)]
struct Case {
    name: String,
    input: String,
    html: String,
    #[serde(default)]
    warnings: usize,
}

#[test]
fn json_cases_render_as_expected() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("tests")
        .join("cases.json");
    let data = fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("cannot read {}: {err}", path.display()));
    let cases: Vec<Case> = serde_json::from_str(&data).expect("cases.json parses");
    assert!(!cases.is_empty());
    for case in cases {
        let result = compile(&case.input, &HtmlOptions::default());
        assert_eq!(result.html, case.html, "case `{}`", case.name);
        assert_eq!(
            result.warnings.len(),
            case.warnings,
            "case `{}` warning count",
            case.name
        );
    }
}
