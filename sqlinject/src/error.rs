use thiserror::Error;

/// Failures surfaced by the detector.
///
/// No input shape produces an error. These are either broken internal
/// invariants of the folding window or malformed dictionary data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("fold rule `{rule}` needs {needed} tokens below slot {pos}")]
    WindowUnderflow {
        rule: &'static str,
        pos: usize,
        needed: usize,
    },

    #[error("token slot {index} is outside the {capacity}-slot window")]
    WindowIndex { index: usize, capacity: usize },

    #[error("invalid dictionary data: {0}")]
    Dictionary(String),
}
