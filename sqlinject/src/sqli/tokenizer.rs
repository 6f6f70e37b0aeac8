//! Byte-level SQL tokenizer.
//!
//! Each call to [`Tokenizer::next_token`] looks at the byte under the
//! cursor, picks a routine from [`CHAR_PARSE_MAP`] and runs it until one
//! produces a token. Routines never fail: anything they cannot make sense of
//! becomes a bareword or an unknown token and is left for the fingerprint
//! stage to judge.

use memchr::{memchr, memmem};
use smallvec::SmallVec;

use crate::sqli::dictionary::{Dictionary, Lookup};
use crate::sqli::sqli_data::{CharParser, CHAR_PARSE_MAP};
use crate::sqli::token::{Token, TokenType, CHAR_NULL, TOKEN_SIZE};
use crate::sqli::SqliFlags;

/// Characters that end a word.
const WORD_STOP: &[u8] = b" []{}<>:\\?=@!#~+-*/&|^%(),';\t\n\x0b\x0c\r\"\xa0\x00";

/// Characters that end an unquoted variable name.
const VAR_STOP: &[u8] = b" <>:\\?=@!#~+-*/&|^%(),';\t\n\x0b\x0c\r'`\"\x00";

const CHAR_SINGLE: u8 = b'\'';
const CHAR_DOUBLE: u8 = b'"';
const CHAR_TICK: u8 = b'`';

fn is_white(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r' | 0xa0 | 0x00)
}

/// Length of the prefix of `s` whose bytes satisfy `accept`.
fn span(s: &[u8], accept: impl Fn(u8) -> bool) -> usize {
    s.iter().take_while(|&&b| accept(b)).count()
}

fn span_until(s: &[u8], stop: &[u8]) -> usize {
    span(s, |b| !stop.contains(&b))
}

fn tail(input: &[u8], from: usize) -> &[u8] {
    input.get(from..).unwrap_or_default()
}

fn is_hex_digit(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

fn is_bin_digit(b: u8) -> bool {
    matches!(b, b'0' | b'1')
}

/// Comment and token counters collected while scanning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenizerStats {
    /// `--` followed by whitespace or end of input.
    pub comment_ddw: usize,
    /// `--` followed by anything else, under ANSI.
    pub comment_ddx: usize,
    /// `/* */` comments.
    pub comment_c: usize,
    /// `#`, counted twice under MySQL where it opens a comment.
    pub comment_hash: usize,
    /// Every token produced, comments included.
    pub tokens: usize,
}

pub struct Tokenizer<'a> {
    input: &'a [u8],
    flags: SqliFlags,
    dictionary: &'a dyn Dictionary,
    pos: usize,
    current: Token,
    stats: TokenizerStats,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a [u8], flags: SqliFlags, dictionary: &'a dyn Dictionary) -> Self {
        Self {
            input,
            flags: flags.normalized(),
            dictionary,
            pos: 0,
            current: Token::new(),
            stats: TokenizerStats::default(),
        }
    }

    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    pub fn flags(&self) -> SqliFlags {
        self.flags
    }

    /// Offset of the next unconsumed byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn stats(&self) -> &TokenizerStats {
        &self.stats
    }

    /// The token written by the last successful [`next_token`](Self::next_token).
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Scans the next token into [`current`](Self::current).
    ///
    /// Returns `false` once the input is exhausted without producing one.
    pub fn next_token(&mut self) -> bool {
        let slen = self.input.len();
        if slen == 0 {
            return false;
        }
        self.current.clear();

        // The first token of a quoted context is the tail of a string the
        // application already opened.
        if self.pos == 0 {
            if let Some(delim) = self.flags.quote_delimiter() {
                self.pos = self.parse_string_core(0, delim, 0);
                self.stats.tokens += 1;
                return true;
            }
        }

        while let Some(&ch) = self.input.get(self.pos) {
            self.pos = self.dispatch(CHAR_PARSE_MAP[usize::from(ch)]);
            if !self.current.is_none() {
                self.stats.tokens += 1;
                return true;
            }
        }
        false
    }

    /// Dictionary lookup with the key uppercased.
    pub(crate) fn lookup(&self, namespace: Lookup, key: &[u8]) -> Option<TokenType> {
        let upper: SmallVec<[u8; TOKEN_SIZE]> = key.iter().map(u8::to_ascii_uppercase).collect();
        self.dictionary.lookup(namespace, &upper)
    }

    fn lookup_word(&self, word: &[u8]) -> Option<TokenType> {
        self.lookup(Lookup::Word, word)
    }

    fn at(&self, index: usize) -> Option<u8> {
        self.input.get(index).copied()
    }

    fn rest(&self, from: usize) -> &'a [u8] {
        tail(self.input, from)
    }

    fn dispatch(&mut self, parser: CharParser) -> usize {
        match parser {
            CharParser::White => self.pos + 1,
            CharParser::Operator1 => self.parse_operator1(),
            CharParser::Operator2 => self.parse_operator2(),
            CharParser::Other => self.parse_other(),
            CharParser::Char => self.parse_char(),
            CharParser::String => self.parse_string(),
            CharParser::Hash => self.parse_hash(),
            CharParser::Money => self.parse_money(),
            CharParser::Dash => self.parse_dash(),
            CharParser::Number => self.parse_number(),
            CharParser::Slash => self.parse_slash(),
            CharParser::Var => self.parse_var(),
            CharParser::BString => self.parse_bit_literal(is_bin_digit),
            CharParser::EString => self.parse_estring(),
            CharParser::NqString => self.parse_nqstring(),
            CharParser::QString => self.parse_qstring_core(0),
            CharParser::UString => self.parse_ustring(),
            CharParser::XString => self.parse_bit_literal(is_hex_digit),
            CharParser::BWord => self.parse_bword(),
            CharParser::Backslash => self.parse_backslash(),
            CharParser::Tick => self.parse_tick(),
            CharParser::Word => self.parse_word(),
        }
    }

    fn parse_operator1(&mut self) -> usize {
        let pos = self.pos;
        if let Some(ch) = self.at(pos) {
            self.current.assign_char(TokenType::Operator, pos, ch);
        }
        pos + 1
    }

    fn parse_other(&mut self) -> usize {
        let pos = self.pos;
        if let Some(ch) = self.at(pos) {
            self.current.assign_char(TokenType::Unknown, pos, ch);
        }
        pos + 1
    }

    /// Single punctuation characters whose type is the character itself.
    fn parse_char(&mut self) -> usize {
        let pos = self.pos;
        if let Some(ch) = self.at(pos) {
            let token_type = TokenType::from_byte(ch).unwrap_or(TokenType::Unknown);
            self.current.assign_char(token_type, pos, ch);
        }
        pos + 1
    }

    fn parse_eol_comment(&mut self) -> usize {
        let pos = self.pos;
        let rest = self.rest(pos);
        match memchr(b'\n', rest) {
            None => {
                self.current.assign(TokenType::Comment, pos, rest.len(), rest);
                self.input.len()
            }
            Some(nl) => {
                self.current.assign(TokenType::Comment, pos, nl, rest);
                pos + nl + 1
            }
        }
    }

    fn parse_hash(&mut self) -> usize {
        self.stats.comment_hash += 1;
        if self.flags.contains(SqliFlags::SQL_MYSQL) {
            self.stats.comment_hash += 1;
            self.parse_eol_comment()
        } else {
            self.current.assign_char(TokenType::Operator, self.pos, b'#');
            self.pos + 1
        }
    }

    fn parse_dash(&mut self) -> usize {
        let pos = self.pos;
        let slen = self.input.len();
        if self.at(pos + 1) == Some(b'-') {
            match self.at(pos + 2) {
                Some(b) if is_white(b) => {
                    self.stats.comment_ddw += 1;
                    return self.parse_eol_comment();
                }
                None if pos + 2 == slen => {
                    self.stats.comment_ddw += 1;
                    return self.parse_eol_comment();
                }
                _ if self.flags.contains(SqliFlags::SQL_ANSI) => {
                    self.stats.comment_ddx += 1;
                    return self.parse_eol_comment();
                }
                _ => {}
            }
        }
        self.current.assign_char(TokenType::Operator, pos, b'-');
        pos + 1
    }

    fn parse_slash(&mut self) -> usize {
        let pos = self.pos;
        if self.at(pos + 1) != Some(b'*') {
            return self.parse_operator1();
        }

        let body = self.rest(pos + 2);
        let close = memmem::find(body, b"*/");
        let clen = match close {
            Some(end) => end + 4,
            None => self.input.len() - pos,
        };

        // A second opener before the close, or a MySQL `/*!` conditional
        // comment, is refused.
        let nested = close
            .and_then(|end| body.get(..end + 1))
            .is_some_and(|inner| memmem::find(inner, b"/*").is_some());
        let conditional = self.at(pos + 2) == Some(b'!');

        let token_type = if nested || conditional {
            TokenType::Evil
        } else {
            TokenType::Comment
        };
        self.stats.comment_c += 1;
        self.current.assign(token_type, pos, clen, tail(self.input, pos));
        pos + clen
    }

    fn parse_backslash(&mut self) -> usize {
        let pos = self.pos;
        if self.at(pos + 1) == Some(b'N') {
            self.current.assign(TokenType::Number, pos, 2, tail(self.input, pos));
            pos + 2
        } else {
            self.current.assign_char(TokenType::Backslash, pos, b'\\');
            pos + 1
        }
    }

    fn parse_operator2(&mut self) -> usize {
        let pos = self.pos;
        if pos + 1 >= self.input.len() {
            return self.parse_operator1();
        }

        let rest = self.rest(pos);
        if rest.starts_with(b"<=>") {
            self.current.assign(TokenType::Operator, pos, 3, rest);
            return pos + 3;
        }

        let pair = rest.get(..2).unwrap_or_default();
        if let Some(token_type) = self.lookup(Lookup::Operator, pair) {
            self.current.assign(token_type, pos, 2, pair);
            return pos + 2;
        }

        if rest.first() == Some(&b':') {
            self.current.assign(TokenType::Colon, pos, 1, rest);
            pos + 1
        } else {
            self.parse_operator1()
        }
    }

    /// Scans a string body for `delim` starting `offset` bytes after `pos`.
    ///
    /// A delimiter preceded by an odd run of backslashes, or doubled, does
    /// not close the string. Unterminated strings run to the end of input
    /// with a null close delimiter.
    fn parse_string_core(&mut self, pos: usize, delim: u8, offset: usize) -> usize {
        let slen = self.input.len();
        let start = pos + offset;
        self.current.str_open = if offset > 0 { delim } else { CHAR_NULL };

        let mut search = start;
        loop {
            match memchr(delim, self.rest(search)).map(|i| search + i) {
                None => {
                    let body = self.rest(start);
                    self.current.assign(TokenType::String, start, body.len(), body);
                    self.current.str_close = CHAR_NULL;
                    return slen;
                }
                Some(q) if self.is_backslash_escaped(start, q) => search = q + 1,
                Some(q) if self.at(q + 1) == Some(delim) => search = q + 2,
                Some(q) => {
                    self.current
                        .assign(TokenType::String, start, q - start, tail(self.input, start));
                    self.current.str_close = delim;
                    return q + 1;
                }
            }
        }
    }

    fn is_backslash_escaped(&self, start: usize, quote: usize) -> bool {
        let run = self
            .input
            .get(start..quote)
            .map_or(0, |s| s.iter().rev().take_while(|&&b| b == b'\\').count());
        run % 2 == 1
    }

    fn parse_string(&mut self) -> usize {
        match self.at(self.pos) {
            Some(delim) => self.parse_string_core(self.pos, delim, 1),
            None => self.pos + 1,
        }
    }

    /// `E'...'`, PostgreSQL escape strings.
    fn parse_estring(&mut self) -> usize {
        let pos = self.pos;
        if pos + 2 >= self.input.len() || self.at(pos + 1) != Some(CHAR_SINGLE) {
            return self.parse_word();
        }
        self.parse_string_core(pos, CHAR_SINGLE, 2)
    }

    /// `U&'...'`, unicode strings.
    fn parse_ustring(&mut self) -> usize {
        let pos = self.pos;
        if pos + 2 < self.input.len()
            && self.at(pos + 1) == Some(b'&')
            && self.at(pos + 2) == Some(CHAR_SINGLE)
        {
            self.pos += 2;
            let end = self.parse_string();
            self.current.str_open = b'u';
            if self.current.str_close == CHAR_SINGLE {
                self.current.str_close = b'u';
            }
            end
        } else {
            self.parse_word()
        }
    }

    /// Oracle `q'<d>...<d>'` strings, `offset` bytes after the cursor.
    fn parse_qstring_core(&mut self, offset: usize) -> usize {
        let pos = self.pos + offset;
        let slen = self.input.len();
        if !matches!(self.at(pos), Some(b'q' | b'Q'))
            || pos + 2 >= slen
            || self.at(pos + 1) != Some(CHAR_SINGLE)
        {
            return self.parse_word();
        }

        let open = match self.at(pos + 2) {
            Some(ch) if (33..=127).contains(&ch) => ch,
            _ => return self.parse_word(),
        };
        let close = match open {
            b'(' => b')',
            b'[' => b']',
            b'{' => b'}',
            b'<' => b'>',
            other => other,
        };

        let body = self.rest(pos + 3);
        self.current.str_open = b'q';
        match memmem::find(body, &[close, CHAR_SINGLE]) {
            None => {
                self.current.assign(TokenType::String, pos + 3, body.len(), body);
                self.current.str_close = CHAR_NULL;
                slen
            }
            Some(end) => {
                self.current.assign(TokenType::String, pos + 3, end, body);
                self.current.str_close = b'q';
                pos + 3 + end + 2
            }
        }
    }

    /// `N'...'` national strings and `nq'...'` Oracle strings.
    fn parse_nqstring(&mut self) -> usize {
        let pos = self.pos;
        if pos + 2 < self.input.len() && self.at(pos + 1) == Some(CHAR_SINGLE) {
            return self.parse_estring();
        }
        self.parse_qstring_core(1)
    }

    /// `b'0101'` and `x'beef'`. Anything malformed is a word.
    fn parse_bit_literal(&mut self, digit: fn(u8) -> bool) -> usize {
        let pos = self.pos;
        if pos + 2 >= self.input.len() || self.at(pos + 1) != Some(CHAR_SINGLE) {
            return self.parse_word();
        }
        let wlen = span(self.rest(pos + 2), digit);
        if self.at(pos + 2 + wlen) != Some(CHAR_SINGLE) {
            return self.parse_word();
        }
        self.current
            .assign(TokenType::Number, pos, wlen + 3, tail(self.input, pos));
        pos + wlen + 3
    }

    /// SQL Server `[bracketed identifier]`.
    fn parse_bword(&mut self) -> usize {
        let pos = self.pos;
        let rest = self.rest(pos);
        match memchr(b']', rest) {
            None => {
                self.current.assign(TokenType::Bareword, pos, rest.len(), rest);
                self.input.len()
            }
            Some(end) => {
                self.current.assign(TokenType::Bareword, pos, end + 1, rest);
                pos + end + 1
            }
        }
    }

    fn parse_word(&mut self) -> usize {
        let pos = self.pos;
        let rest = self.rest(pos);
        let wlen = span_until(rest, WORD_STOP);
        self.current.assign(TokenType::Bareword, pos, wlen, rest);

        // `SELECT.1` or SELECT`col`: split when the part before the
        // separator is a known word.
        let word = self.current;
        for (i, &b) in word.value().iter().enumerate() {
            if b != b'.' && b != CHAR_TICK {
                continue;
            }
            let prefix = word.value().get(..i).unwrap_or_default();
            match self.lookup_word(prefix) {
                Some(TokenType::Bareword) | None => {}
                Some(token_type) => {
                    self.current.clear();
                    self.current.assign(token_type, pos, i, rest);
                    return pos + i;
                }
            }
        }

        if wlen < TOKEN_SIZE {
            self.current.token_type = self
                .lookup_word(word.value())
                .unwrap_or(TokenType::Bareword);
        }
        pos + wlen
    }

    /// Backtick identifier: a bareword unless the dictionary knows it as a
    /// function.
    fn parse_tick(&mut self) -> usize {
        let end = self.parse_string_core(self.pos, CHAR_TICK, 1);
        let word = self.current;
        self.current.token_type = match self.lookup_word(word.value()) {
            Some(TokenType::Function) => TokenType::Function,
            _ => TokenType::Bareword,
        };
        end
    }

    fn parse_var(&mut self) -> usize {
        let mut pos = self.pos + 1;
        if self.at(pos) == Some(b'@') {
            pos += 1;
            self.current.var_count = 2;
        } else {
            self.current.var_count = 1;
        }

        // MySQL allows @@`version` and @'name'
        match self.at(pos) {
            Some(CHAR_TICK) => {
                self.pos = pos;
                let end = self.parse_tick();
                self.current.token_type = TokenType::Variable;
                return end;
            }
            Some(CHAR_SINGLE | CHAR_DOUBLE) => {
                self.pos = pos;
                let end = self.parse_string();
                self.current.token_type = TokenType::Variable;
                return end;
            }
            _ => {}
        }

        let rest = self.rest(pos);
        let xlen = span_until(rest, VAR_STOP);
        self.current.assign(TokenType::Variable, pos, xlen, rest);
        pos + xlen
    }

    /// `$1,000.00`, PostgreSQL `$$...$$` and `$tag$...$tag$` strings, or a
    /// bare `$`.
    fn parse_money(&mut self) -> usize {
        let pos = self.pos;
        let slen = self.input.len();
        if pos + 1 == slen {
            self.current.assign_char(TokenType::Bareword, pos, b'$');
            return slen;
        }

        let after = self.rest(pos + 1);
        let xlen = span(after, |b| b.is_ascii_digit() || b == b'.' || b == b',');
        if xlen == 1 && after.first() == Some(&b'.') {
            return self.parse_word();
        }
        if xlen > 0 {
            self.current
                .assign(TokenType::Number, pos, 1 + xlen, tail(self.input, pos));
            return pos + 1 + xlen;
        }

        if after.first() == Some(&b'$') {
            let start = pos + 2;
            return self.dollar_quoted(start, b"$$");
        }

        let tag_len = span(after, |b| b.is_ascii_alphabetic());
        if tag_len == 0 || self.at(pos + tag_len + 1) != Some(b'$') {
            self.current.assign_char(TokenType::Bareword, pos, b'$');
            return pos + 1;
        }
        let tag = self
            .input
            .get(pos..pos + tag_len + 2)
            .unwrap_or_default();
        self.dollar_quoted(pos + tag_len + 2, tag)
    }

    fn dollar_quoted(&mut self, start: usize, tag: &[u8]) -> usize {
        let body = self.rest(start);
        self.current.str_open = b'$';
        match memmem::find(body, tag) {
            None => {
                self.current.assign(TokenType::String, start, body.len(), body);
                self.current.str_close = CHAR_NULL;
                self.input.len()
            }
            Some(end) => {
                self.current.assign(TokenType::String, start, end, body);
                self.current.str_close = b'$';
                start + end + tag.len()
            }
        }
    }

    fn parse_number(&mut self) -> usize {
        let start = self.pos;
        let slen = self.input.len();

        if self.at(start) == Some(b'0') {
            let digit: Option<fn(u8) -> bool> = match self.at(start + 1) {
                Some(b'x' | b'X') => Some(is_hex_digit as fn(u8) -> bool),
                Some(b'b' | b'B') => Some(is_bin_digit as fn(u8) -> bool),
                _ => None,
            };
            if let Some(digit) = digit {
                let xlen = span(self.rest(start + 2), digit);
                let token_type = if xlen == 0 {
                    TokenType::Bareword
                } else {
                    TokenType::Number
                };
                self.current
                    .assign(token_type, start, 2 + xlen, tail(self.input, start));
                return start + 2 + xlen;
            }
        }

        let mut pos = start + span(self.rest(start), |b| b.is_ascii_digit());
        if self.at(pos) == Some(b'.') {
            pos += 1;
            pos += span(self.rest(pos), |b| b.is_ascii_digit());
            if pos - start == 1 {
                self.current.assign_char(TokenType::Dot, start, b'.');
                return pos;
            }
        }

        let mut have_e = false;
        let mut have_exp = false;
        if matches!(self.at(pos), Some(b'e' | b'E')) {
            have_e = true;
            pos += 1;
            if matches!(self.at(pos), Some(b'+' | b'-')) {
                pos += 1;
            }
            let digits = span(self.rest(pos), |b| b.is_ascii_digit());
            have_exp = digits > 0;
            pos += digits;
        }

        // Oracle float/double suffix, kept only when it cannot start a word
        // (`1fUNION` still splits as `1f` + `UNION`).
        if matches!(self.at(pos), Some(b'd' | b'D' | b'f' | b'F')) {
            let absorb = match self.at(pos + 1) {
                None => pos + 1 == slen,
                Some(next) => is_white(next) || matches!(next, b';' | b'u' | b'U'),
            };
            if absorb {
                pos += 1;
            }
        }

        let token_type = if have_e && !have_exp {
            TokenType::Bareword
        } else {
            TokenType::Number
        };
        self.current
            .assign(token_type, start, pos - start, tail(self.input, start));
        pos
    }
}

/// Lazy token sequence over one input, see [`crate::tokenize`].
pub struct Tokens<'a> {
    tokenizer: Tokenizer<'a>,
}

impl<'a> Tokens<'a> {
    pub fn new(tokenizer: Tokenizer<'a>) -> Self {
        Self { tokenizer }
    }

    /// Counters gathered up to the last token yielded.
    pub fn stats(&self) -> &TokenizerStats {
        self.tokenizer.stats()
    }
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.tokenizer.next_token() {
            Some(*self.tokenizer.current())
        } else {
            None
        }
    }
}
