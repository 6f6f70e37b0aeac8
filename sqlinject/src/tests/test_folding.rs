use pretty_assertions::assert_eq;

use super::run_fixtures;
use crate::{SqliFlags, SqliState, StaticDictionary};

/// Folded tokens in the same `type value` layout as the token fixtures.
fn render_folded(input: &str) -> String {
    let mut state = SqliState::new(
        input.as_bytes(),
        SqliFlags::QUOTE_NONE | SqliFlags::SQL_ANSI,
        StaticDictionary::builtin(),
    );
    state.fingerprint().unwrap();
    state
        .tokens()
        .iter()
        .map(|token| token.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn all_folding_files() {
    let count = run_fixtures("test-folding-", render_folded);
    assert!(count >= 10);
}

#[test]
fn evil_replaces_the_window() {
    assert_eq!(render_folded("1 /*!union*/"), "X X");
}

#[test]
fn merged_phrase_keeps_original_case() {
    assert_eq!(render_folded("1 UNION all SELECT"), "1 1\nU UNION all\nE SELECT");
}

#[test]
fn refolding_is_stable() {
    let mut state = SqliState::new(b"1 and 1<2", SqliFlags::empty(), StaticDictionary::builtin());
    let first = state.fingerprint().unwrap();
    let folds = state.folds();
    let second = state.fingerprint().unwrap();
    assert_eq!(first, second);
    assert_eq!(state.folds(), folds);
}
