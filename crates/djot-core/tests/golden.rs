//! Golden tests: each `tests/fixtures/*.dj` file at the workspace root must
//! render to the matching `tests/expect/*.html` file.

use std::fs;
use std::path::{Path, PathBuf};

use djot_core::{HtmlOptions, compile};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn collect(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap_or_else(|err| panic!("cannot read {}: {err}", dir.display()))
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .collect();
    files.sort();
    files
}

fn file_stem(path: &Path) -> String {
    path.file_stem().unwrap().to_string_lossy().into_owned()
}

#[test]
fn fixtures_render_to_their_expected_html() {
    let root = workspace_root();
    let fixtures = collect(&root.join("tests").join("fixtures"), "dj");
    assert!(!fixtures.is_empty(), "no fixtures found");
    let expect_dir = root.join("tests").join("expect");
    for fixture in fixtures {
        let name = file_stem(&fixture);
        let source = fs::read_to_string(&fixture).unwrap();
        let expected_path = expect_dir.join(format!("{name}.html"));
        let expected = fs::read_to_string(&expected_path)
            .unwrap_or_else(|err| panic!("missing expectation for {name}: {err}"));
        let result = compile(&source, &HtmlOptions::default());
        assert_eq!(
            result.html.trim_end(),
            expected.trim_end(),
            "fixture {name} rendered differently"
        );
    }
}

#[test]
fn fixtures_survive_sanitization_unchanged_except_raw_html() {
    let root = workspace_root();
    let fixtures = collect(&root.join("tests").join("fixtures"), "dj");
    for fixture in fixtures {
        let source = fs::read_to_string(&fixture).unwrap();
        let (document, _) = djot_core::parse_document(&source);
        let clean = djot_core::render_html_sanitized(&document, &HtmlOptions::default());
        assert!(
            !clean.contains("<script"),
            "sanitized output of {} contains a script tag",
            file_stem(&fixture)
        );
    }
}
