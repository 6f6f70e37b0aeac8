//! Fingerprint rendering and classification.
//!
//! A fingerprint is the string of type codes left after folding. It is
//! injection-shaped when the dictionary blacklists it, unless one of the
//! whitelist heuristics below recognises a common false positive.

use core::fmt;

use memchr::memmem;
use tracing::debug;

use crate::sqli::dictionary::Lookup;
use crate::sqli::fold::SqliState;
use crate::sqli::token::{Token, TokenType, CHAR_NULL};
use crate::Error;

/// Room for five tokens, a re-appended comment and slack.
const FINGERPRINT_CAPACITY: usize = 8;

/// Short ASCII summary of a folded token sequence, e.g. `s&sos`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fingerprint {
    bytes: [u8; FINGERPRINT_CAPACITY],
    len: usize,
}

impl Fingerprint {
    pub(crate) fn from_tokens(tokens: &[Token]) -> Self {
        let mut fp = Self::default();
        for (dst, token) in fp.bytes.iter_mut().zip(tokens) {
            *dst = token.token_type.as_byte();
            fp.len += 1;
        }
        fp
    }

    /// The single-character fingerprint used when parsing broke down.
    pub fn evil() -> Self {
        let mut fp = Self::default();
        fp.bytes[0] = TokenType::Evil.as_byte();
        fp.len = 1;
        fp
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.get(..self.len).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_evil(&self) -> bool {
        self.as_bytes() == [TokenType::Evil.as_byte()]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fingerprint").field(&self.as_str()).finish()
    }
}

impl PartialEq<str> for Fingerprint {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Fingerprint {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl SqliState<'_> {
    /// Folds the input from the start and renders the fingerprint.
    pub fn fingerprint(&mut self) -> Result<Fingerprint, Error> {
        self.reset(self.flags());
        let tlen = self.fold()?;

        // PHP's magic backtick leaves an empty, unclosed trailing identifier
        if tlen > 2 {
            let last = self.window_mut().get_mut(tlen - 1)?;
            if last.is_type(TokenType::Bareword)
                && last.str_open == b'`'
                && last.len == 0
                && last.str_close == CHAR_NULL
            {
                last.token_type = TokenType::Comment;
            }
        }

        let mut fp = Fingerprint::from_tokens(self.tokens());
        if fp.as_bytes().contains(&TokenType::Evil.as_byte()) {
            let window = self.window_mut();
            window.clear();
            let mut evil = Token::new();
            evil.assign_char(TokenType::Evil, 0, TokenType::Evil.as_byte());
            window.set(0, evil)?;
            self.set_len(1);
            fp = Fingerprint::evil();
        }

        self.fingerprint = fp;
        Ok(fp)
    }

    /// The fingerprint rendered by the last [`fingerprint`](Self::fingerprint).
    pub fn last_fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn is_blacklisted(&self) -> bool {
        if self.fingerprint.is_empty() {
            return false;
        }
        self.lookup(Lookup::Fingerprint, self.fingerprint.as_bytes())
            == Some(TokenType::Fingerprint)
    }

    /// Blacklisted and not explained away by a whitelist rule.
    pub fn check_fingerprint(&self) -> bool {
        self.is_blacklisted() && self.is_not_whitelisted()
    }

    fn verdict(&self, rule: &'static str, sqli: bool) -> bool {
        debug!(fingerprint = %self.fingerprint, rule, sqli, "whitelist");
        sqli
    }

    /// False when the blacklisted shape is a known false positive.
    pub fn is_not_whitelisted(&self) -> bool {
        let fp = self.fingerprint.as_bytes();

        // SQL Server keeps statements mentioning sp_password out of its audit log
        if fp.len() > 1
            && fp.last() == Some(&TokenType::Comment.as_byte())
            && memmem::find(self.input(), b"sp_password").is_some()
        {
            return self.verdict("sp-password", true);
        }

        match *self.tokens() {
            [t0, t1] => self.check_two(&t0, &t1),
            [t0, t1, t2] => self.check_three(fp, &t0, &t1, &t2),
            [_, t1, t2, t3] => self.check_four(fp, &t1, &t2, &t3),
            _ => true,
        }
    }

    /// Two-token shapes are short enough to appear in ordinary text.
    fn check_two(&self, t0: &Token, t1: &Token) -> bool {
        let stats_tokens = self.stats().tokens;

        if t1.is_type(TokenType::Union) {
            return self.verdict("short-union", stats_tokens > 2);
        }

        if t1.first_byte() == b'#' {
            return self.verdict("hash", false);
        }

        // only `/* */` after a bareword looks like SQL; `--` and `#` are prose
        if t0.is_type(TokenType::Bareword)
            && t1.is_type(TokenType::Comment)
            && t1.first_byte() != b'/'
        {
            return self.verdict("bareword-comment", false);
        }

        if t0.is_type(TokenType::Number) && t1.is_type(TokenType::Comment) {
            if t1.first_byte() == b'/' {
                return self.verdict("number-c-comment", true);
            }
            if stats_tokens > 2 {
                return self.verdict("number-comment-folded", true);
            }
            // `1234-ABCD--` style noise folds to 1c too; require the number
            // to be followed by a space or a real comment opener
            let input = self.input();
            let after = t0.pos + t0.len;
            let sqli = match input.get(after) {
                None => true,
                Some(&ch) if ch <= 32 => true,
                Some(b'/') => input.get(after + 1) == Some(&b'*'),
                Some(b'-') => input.get(after + 1) == Some(&b'-'),
                Some(_) => false,
            };
            return self.verdict("number-comment", sqli);
        }

        if t1.len > 2 && t1.first_byte() == b'-' {
            return self.verdict("dash-comment", false);
        }

        true
    }

    fn check_three(&self, fp: &[u8], t0: &Token, t1: &Token, t2: &Token) -> bool {
        match fp {
            // foo' + 'bar: both ends open, joined by the same quote
            b"sos" | b"s&s" => self.verdict(
                "string-splice",
                t0.str_open == CHAR_NULL && t2.str_close == CHAR_NULL && t0.str_close == t2.str_open,
            ),
            b"s&n" | b"n&1" | b"1&1" | b"1&v" | b"1&s" if self.stats().tokens == 3 => {
                self.verdict("short-logic", false)
            }
            _ if t1.is_type(TokenType::Keyword)
                && !t1.value_eq_ignore_case("INTO OUTFILE")
                && !t1.value_eq_ignore_case("INTO DUMPFILE") =>
            {
                self.verdict("keyword", false)
            }
            _ => true,
        }
    }

    fn check_four(&self, fp: &[u8], t1: &Token, t2: &Token, t3: &Token) -> bool {
        // `!@#` typed as a password
        if matches!(fp, b"novc" | b"1ovc")
            && t1.value() == b"!"
            && t2.len == 0
            && t3.first_byte() == b'#'
        {
            return self.verdict("bang-at-hash", false);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::sqli::{SqliFlags, StaticDictionary};

    fn state(input: &str, flags: SqliFlags) -> SqliState<'_> {
        SqliState::new(input.as_bytes(), flags, StaticDictionary::builtin())
    }

    fn fp(input: &str, flags: SqliFlags) -> String {
        state(input, flags).fingerprint().unwrap().to_string()
    }

    #[test]
    fn fingerprint_value_type() {
        let evil = Fingerprint::evil();
        assert!(evil.is_evil());
        assert_eq!(evil, "X");
        assert_eq!(evil.len(), 1);
        assert!(Fingerprint::default().is_empty());
        assert_eq!(format!("{:?}", evil), "Fingerprint(\"X\")");
    }

    #[test]
    fn renders_folded_types() {
        assert_eq!(fp("1 UNION SELECT password FROM users", SqliFlags::empty()), "1UEnk");
        assert_eq!(fp("select * from users where id = 1", SqliFlags::empty()), "Eoknk");
        assert_eq!(fp("' or ''='", SqliFlags::QUOTE_SINGLE), "s&sos");
        assert_eq!(fp("", SqliFlags::empty()), "");
    }

    #[test]
    fn evil_collapses_everything() {
        let mut s = state("/*!union*/ select 1", SqliFlags::empty());
        assert_eq!(s.fingerprint().unwrap(), "X");
        assert_eq!(s.tokens().len(), 1);
        assert_eq!(s.tokens()[0].value(), b"X");
        assert!(s.check_fingerprint());
    }

    #[test]
    fn magic_backtick_becomes_comment() {
        assert_eq!(fp("1 union `", SqliFlags::empty()), "1Uc");
    }

    #[test]
    fn short_union_needs_more_than_two_tokens() {
        let mut s = state("1 union", SqliFlags::empty());
        assert_eq!(s.fingerprint().unwrap(), "1U");
        assert!(s.is_blacklisted());
        assert!(!s.check_fingerprint());
    }

    #[test]
    fn short_logic_phrases() {
        let mut s = state("1 and 1", SqliFlags::empty());
        assert_eq!(s.fingerprint().unwrap(), "1&1");
        assert!(!s.check_fingerprint());

        let mut s = state("1 and 1<2", SqliFlags::empty());
        assert_eq!(s.fingerprint().unwrap(), "1&1");
        assert_eq!(s.stats().tokens, 5);
        assert!(s.check_fingerprint());
    }

    #[test]
    fn number_comment() {
        let mut s = state("1234 --", SqliFlags::empty());
        assert_eq!(s.fingerprint().unwrap(), "1c");
        assert!(s.check_fingerprint());

        let mut s = state("1/* x */", SqliFlags::empty());
        assert_eq!(s.fingerprint().unwrap(), "1c");
        assert!(s.check_fingerprint());

        let mut s = state("2022#hashtag", SqliFlags::SQL_MYSQL);
        assert_eq!(s.fingerprint().unwrap(), "1c");
        assert!(!s.check_fingerprint());
    }

    #[test]
    fn bareword_comment_is_prose() {
        let mut s = state("foo -- ", SqliFlags::empty());
        assert_eq!(s.fingerprint().unwrap(), "nc");
        assert!(!s.check_fingerprint());

        let mut s = state("foo -- sp_password", SqliFlags::empty());
        assert_eq!(s.fingerprint().unwrap(), "nc");
        assert!(s.check_fingerprint());
    }

    #[test]
    fn string_splice() {
        let mut s = state("foo\" + \"bar", SqliFlags::QUOTE_DOUBLE | SqliFlags::SQL_MYSQL);
        assert_eq!(s.fingerprint().unwrap(), "sos");
        assert!(s.check_fingerprint());

        let mut s = state("'a' + 'b'", SqliFlags::empty());
        assert_eq!(s.fingerprint().unwrap(), "sos");
        assert!(!s.check_fingerprint());
    }

    #[test]
    fn password_punctuation() {
        let mut s = state("x!@#", SqliFlags::SQL_MYSQL);
        assert_eq!(s.fingerprint().unwrap(), "novc");
        assert!(s.is_blacklisted());
        assert!(!s.check_fingerprint());
    }
}
