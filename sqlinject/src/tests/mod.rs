#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod properties;
mod test_folding;

use std::fs;
use std::path::{Path, PathBuf};

/// One `--TEST-- / --INPUT-- / --EXPECTED--` fixture.
#[derive(Debug)]
pub(crate) struct TestCase {
    pub name: String,
    pub input: String,
    pub expected: String,
}

enum Section {
    Preamble,
    Name,
    Input,
    Expected,
}

pub(crate) fn parse_test_file(content: &str) -> Option<TestCase> {
    let mut section = Section::Preamble;
    let mut name = String::new();
    let mut input: Vec<&str> = Vec::new();
    let mut expected: Vec<&str> = Vec::new();

    for line in content.lines() {
        section = match (section, line) {
            (Section::Preamble, "--TEST--") => Section::Name,
            (Section::Name | Section::Preamble, "--INPUT--") => Section::Input,
            (Section::Input, "--EXPECTED--") => Section::Expected,
            (Section::Name, line) => {
                name.push_str(line);
                Section::Name
            }
            (Section::Input, line) => {
                input.push(line);
                Section::Input
            }
            (Section::Expected, line) => {
                if !line.is_empty() {
                    expected.push(line);
                }
                Section::Expected
            }
            (Section::Preamble, _) => Section::Preamble,
        };
    }

    matches!(section, Section::Expected).then(|| TestCase {
        name,
        input: input.join("\n"),
        expected: expected.join("\n"),
    })
}

fn testdata_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

/// Runs `render` over every fixture whose file name starts with `prefix`
/// and fails with a summary of all mismatches.
pub(crate) fn run_fixtures(prefix: &str, render: impl Fn(&str) -> String) -> usize {
    let mut files: Vec<PathBuf> = fs::read_dir(testdata_dir())
        .expect("testdata directory")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix) && n.ends_with(".txt"))
        })
        .collect();
    files.sort();
    assert!(!files.is_empty(), "no {prefix}* fixtures found");

    let mut failures = Vec::new();
    for path in &files {
        let content = fs::read_to_string(path).unwrap();
        let case = parse_test_file(&content)
            .unwrap_or_else(|| panic!("malformed fixture {}", path.display()));
        let actual = render(&case.input);
        if actual != case.expected {
            failures.push(format!(
                "{} ({})\ninput: {:?}\nexpected:\n{}\nactual:\n{}",
                path.display(),
                case.name,
                case.input,
                case.expected,
                actual
            ));
        }
    }

    if !failures.is_empty() {
        panic!(
            "{} of {} {prefix}* fixtures failed:\n\n{}",
            failures.len(),
            files.len(),
            failures.join("\n\n")
        );
    }
    files.len()
}

#[test]
fn fixture_parser() {
    let case = parse_test_file(
        "--TEST--\nsample\n--INPUT--\nline one\nline two\n--EXPECTED--\n1 1\n\n; ;\n",
    )
    .unwrap();
    assert_eq!(case.name, "sample");
    assert_eq!(case.input, "line one\nline two");
    assert_eq!(case.expected, "1 1\n; ;");

    assert!(parse_test_file("--TEST--\nno input\n").is_none());
}
