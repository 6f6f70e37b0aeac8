#![doc = include_str!("../README.md")]
//!
//! ## API Guide
//!
//! Most applications only need [`detect_sqli`]. It tries every quote context
//! and dialect an attacker could be writing into and reports the first
//! positive verdict together with its [`Fingerprint`].
//!
//! The lower-level pieces are public for tooling and debugging:
//!
//! - [`detect_sqli_with_flags`] and [`fingerprint`] check one explicit context
//! - [`tokenize`] streams the raw tokens of one context
//! - [`SqliDetector`] runs the same operations against a custom [`Dictionary`]
//! - [`SqliState`] exposes the folded token window and the whitelist stage
//!
//! Classification decisions are reported through `tracing` at `debug` level
//! and individual fold rules at `trace` level.

mod error;
pub mod sqli;

#[cfg(test)]
mod tests;

pub use error::Error;
pub use sqli::{
    DetectionResult, Dictionary, DictionaryBuilder, Fingerprint, Lookup, SqliDetector, SqliFlags,
    SqliState, StaticDictionary, Token, TokenType, Tokenizer, TokenizerStats, Tokens,
};

/// Detects SQL injection using the built-in dictionary.
///
/// The input is checked as-is and, depending on its contents, as the tail of
/// a single- or double-quoted string and under MySQL comment rules.
///
/// ```
/// use sqlinject::detect_sqli;
///
/// assert!(!detect_sqli(b"hello world")?.is_injection());
///
/// let result = detect_sqli(b"1' OR '1'='1")?;
/// assert!(result.is_injection());
/// assert_eq!(result.fingerprint(), "s&sos");
/// # Ok::<(), sqlinject::Error>(())
/// ```
pub fn detect_sqli(input: &[u8]) -> Result<DetectionResult, Error> {
    SqliDetector::default().detect(input)
}

/// Detects SQL injection in exactly one context.
///
/// ```
/// use sqlinject::{detect_sqli_with_flags, SqliFlags};
///
/// let result = detect_sqli_with_flags(b"admin'--", SqliFlags::QUOTE_SINGLE)?;
/// assert!(result.is_injection());
/// # Ok::<(), sqlinject::Error>(())
/// ```
pub fn detect_sqli_with_flags(input: &[u8], flags: SqliFlags) -> Result<DetectionResult, Error> {
    SqliDetector::default().detect_with_flags(input, flags)
}

/// Folds the input under `flags` and returns its fingerprint.
///
/// ```
/// use sqlinject::{fingerprint, SqliFlags};
///
/// let fp = fingerprint(b"1 UNION SELECT password FROM users", SqliFlags::SQL_ANSI)?;
/// assert_eq!(fp.as_str(), "1UEnk");
/// # Ok::<(), sqlinject::Error>(())
/// ```
pub fn fingerprint(input: &[u8], flags: SqliFlags) -> Result<Fingerprint, Error> {
    SqliDetector::default().fingerprint(input, flags)
}

/// Streams the tokens of `input` without folding.
///
/// ```
/// use sqlinject::{tokenize, SqliFlags, TokenType};
///
/// let types: Vec<TokenType> = tokenize(b"1 OR 2", SqliFlags::empty())
///     .map(|t| t.token_type)
///     .collect();
/// assert_eq!(types, [TokenType::Number, TokenType::LogicOperator, TokenType::Number]);
/// ```
pub fn tokenize(input: &[u8], flags: SqliFlags) -> Tokens<'_> {
    SqliDetector::default().tokenize(input, flags)
}

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
