//! SQL injection detection.
//!
//! Input is tokenized, folded into at most five significant tokens and the
//! resulting type string is checked against a blacklist of known injection
//! shapes. [`SqliDetector::detect`] repeats this under several quote and
//! dialect assumptions and stops at the first positive verdict.

use core::fmt;

use memchr::memchr;
use tracing::debug;

mod dictionary;
mod fingerprint;
mod fold;
mod sqli_data;
pub mod token;
pub mod tokenizer;
mod window;


pub use dictionary::{Dictionary, DictionaryBuilder, Lookup, StaticDictionary};
pub use fingerprint::Fingerprint;
pub use fold::{SqliState, MAX_TOKENS};
pub use token::{Token, TokenType, TOKEN_SIZE};
pub use tokenizer::{Tokenizer, TokenizerStats, Tokens};
pub use window::{TokenWindow, WINDOW_CAPACITY};

use crate::Error;

bitflags::bitflags! {
    /// Quote context and SQL dialect for a single scan.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SqliFlags: u32 {
        /// Input is not inside a string.
        const QUOTE_NONE = 1 << 0;
        /// Input continues a string opened with `'`.
        const QUOTE_SINGLE = 1 << 1;
        /// Input continues a string opened with `"`.
        const QUOTE_DOUBLE = 1 << 2;
        /// `--` opens a comment even without trailing whitespace.
        const SQL_ANSI = 1 << 3;
        /// `#` comments, `--x` is not a comment, `"` delimits strings.
        const SQL_MYSQL = 1 << 4;
    }
}

impl SqliFlags {
    const QUOTES: Self = Self::QUOTE_NONE
        .union(Self::QUOTE_SINGLE)
        .union(Self::QUOTE_DOUBLE);
    const DIALECTS: Self = Self::SQL_ANSI.union(Self::SQL_MYSQL);

    /// Leaves exactly one quote bit and one dialect bit set.
    ///
    /// An empty group falls back to `QUOTE_NONE` or `SQL_ANSI`. When a group
    /// carries several bits, `QUOTE_SINGLE` beats `QUOTE_DOUBLE`, which beats
    /// `QUOTE_NONE`, and `SQL_ANSI` beats `SQL_MYSQL`.
    pub fn normalized(self) -> Self {
        let quote = if self.contains(Self::QUOTE_SINGLE) {
            Self::QUOTE_SINGLE
        } else if self.contains(Self::QUOTE_DOUBLE) {
            Self::QUOTE_DOUBLE
        } else {
            Self::QUOTE_NONE
        };
        let dialect = if self.contains(Self::SQL_MYSQL) && !self.contains(Self::SQL_ANSI) {
            Self::SQL_MYSQL
        } else {
            Self::SQL_ANSI
        };
        self.difference(Self::QUOTES.union(Self::DIALECTS))
            .union(quote)
            .union(dialect)
    }

    /// The quote the input is assumed to start inside of.
    pub fn quote_delimiter(self) -> Option<u8> {
        if self.contains(Self::QUOTE_SINGLE) {
            Some(b'\'')
        } else if self.contains(Self::QUOTE_DOUBLE) {
            Some(b'"')
        } else {
            None
        }
    }
}

impl Default for SqliFlags {
    fn default() -> Self {
        Self::QUOTE_NONE | Self::SQL_ANSI
    }
}

/// Verdict of a detection run.
///
/// Fingerprint and flags belong to the context that produced a positive
/// verdict, or to the last context tried when nothing matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionResult {
    is_injection: bool,
    fingerprint: Fingerprint,
    flags: SqliFlags,
}

impl DetectionResult {
    pub fn is_injection(&self) -> bool {
        self.is_injection
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn flags(&self) -> SqliFlags {
        self.flags
    }
}

impl fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_injection {
            write!(f, "SQL injection detected: {}", self.fingerprint)
        } else {
            f.write_str("safe")
        }
    }
}

/// Runs detection against one dictionary.
///
/// The detector holds nothing but the dictionary reference, so it is cheap
/// to copy and can be shared between threads.
#[derive(Clone, Copy)]
pub struct SqliDetector<'d> {
    dictionary: &'d dyn Dictionary,
}

impl Default for SqliDetector<'static> {
    fn default() -> Self {
        Self::with_dictionary(StaticDictionary::builtin())
    }
}

impl fmt::Debug for SqliDetector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliDetector").finish_non_exhaustive()
    }
}

impl<'d> SqliDetector<'d> {
    pub fn with_dictionary(dictionary: &'d dyn Dictionary) -> Self {
        Self { dictionary }
    }

    /// Tests the input in every context an attacker could be writing into.
    ///
    /// 1. as-is, ANSI
    /// 2. as-is, MySQL, when the ANSI scan saw comments MySQL reads differently
    /// 3. inside `'`, ANSI, when the input holds a `'` (and MySQL again as in 2)
    /// 4. inside `"`, MySQL, when the input holds a `"`
    pub fn detect(&self, input: &[u8]) -> Result<DetectionResult, Error> {
        let mut state = SqliState::new(input, SqliFlags::default(), self.dictionary);
        if input.is_empty() {
            return Ok(DetectionResult {
                is_injection: false,
                fingerprint: Fingerprint::default(),
                flags: state.flags(),
            });
        }

        let result = attempt(&mut state, SqliFlags::QUOTE_NONE | SqliFlags::SQL_ANSI)?;
        if result.is_injection {
            return Ok(result);
        }
        let mut result = result;

        if needs_mysql_reparse(state.stats()) {
            result = attempt(&mut state, SqliFlags::QUOTE_NONE | SqliFlags::SQL_MYSQL)?;
            if result.is_injection {
                return Ok(result);
            }
        }

        if memchr(b'\'', input).is_some() {
            result = attempt(&mut state, SqliFlags::QUOTE_SINGLE | SqliFlags::SQL_ANSI)?;
            if result.is_injection {
                return Ok(result);
            }
            if needs_mysql_reparse(state.stats()) {
                result = attempt(&mut state, SqliFlags::QUOTE_SINGLE | SqliFlags::SQL_MYSQL)?;
                if result.is_injection {
                    return Ok(result);
                }
            }
        }

        // ANSI reads `"` as identifier quoting
        if memchr(b'"', input).is_some() {
            result = attempt(&mut state, SqliFlags::QUOTE_DOUBLE | SqliFlags::SQL_MYSQL)?;
        }

        Ok(result)
    }

    /// Tests the input in exactly one context.
    pub fn detect_with_flags(
        &self,
        input: &[u8],
        flags: SqliFlags,
    ) -> Result<DetectionResult, Error> {
        let mut state = SqliState::new(input, flags, self.dictionary);
        attempt(&mut state, flags)
    }

    pub fn fingerprint(&self, input: &[u8], flags: SqliFlags) -> Result<Fingerprint, Error> {
        SqliState::new(input, flags, self.dictionary).fingerprint()
    }

    pub fn tokenize<'a>(&self, input: &'a [u8], flags: SqliFlags) -> Tokens<'a>
    where
        'd: 'a,
    {
        Tokens::new(Tokenizer::new(input, flags, self.dictionary))
    }
}

fn attempt(state: &mut SqliState<'_>, flags: SqliFlags) -> Result<DetectionResult, Error> {
    state.reset(flags);
    let fingerprint = state.fingerprint()?;
    let is_injection = state.check_fingerprint();
    debug!(flags = ?state.flags(), %fingerprint, is_injection, "sqli context");
    Ok(DetectionResult {
        is_injection,
        fingerprint,
        flags: state.flags(),
    })
}

/// `--x` and `#` only hide the rest of the line under one of the dialects.
fn needs_mysql_reparse(stats: &TokenizerStats) -> bool {
    let reparse = stats.comment_ddx > 0 || stats.comment_hash > 0;
    if reparse {
        debug!(
            ddx = stats.comment_ddx,
            hash = stats.comment_hash,
            "reparsing as mysql"
        );
    }
    reparse
}
