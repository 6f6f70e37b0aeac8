//! Token folding.
//!
//! The folding engine pulls tokens from the tokenizer into a [`TokenWindow`]
//! and rewrites adjacent pairs and triples into a shorter canonical shape.
//! `left` marks the first token not yet settled and `pos` the next free
//! slot. Rules are tried in a fixed order; the first match wins and the scan
//! restarts from the adjusted marks. Removing a token always compacts the
//! window so later tokens stay in order.

use smallvec::SmallVec;
use tracing::trace;

use crate::sqli::dictionary::{Dictionary, Lookup};
use crate::sqli::fingerprint::Fingerprint;
use crate::sqli::token::{Token, TokenType, TOKEN_SIZE};
use crate::sqli::tokenizer::{Tokenizer, TokenizerStats};
use crate::sqli::window::TokenWindow;
use crate::sqli::SqliFlags;
use crate::Error;

/// Significant tokens kept after folding.
pub const MAX_TOKENS: usize = 5;

/// Words that read as bareword columns unless called like a function.
const PSEUDO_FUNCTIONS: &[&str] = &[
    "USER_ID",
    "USER_NAME",
    "DATABASE",
    "PASSWORD",
    "USER",
    "CURRENT_USER",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "LOCALTIME",
    "LOCALTIMESTAMP",
];

/// What the scan loop does after a rule table has been consulted.
enum Flow {
    /// Nothing rewrote the window; move on to the next stage.
    Fallthrough,
    /// A rule fired; restart the loop with the updated marks.
    Restart,
    /// Folding is over with this many tokens.
    Stop(usize),
}

/// Scan state for one detection attempt.
///
/// Owns the tokenizer and the folding window. A state is tied to one set of
/// flags; [`SqliState::reset`] starts over under different ones.
pub struct SqliState<'a> {
    dictionary: &'a dyn Dictionary,
    tokenizer: Tokenizer<'a>,
    window: TokenWindow,
    folds: usize,
    len: usize,
    pub(crate) fingerprint: Fingerprint,
}

impl<'a> SqliState<'a> {
    pub fn new(input: &'a [u8], flags: SqliFlags, dictionary: &'a dyn Dictionary) -> Self {
        Self {
            dictionary,
            tokenizer: Tokenizer::new(input, flags, dictionary),
            window: TokenWindow::new(),
            folds: 0,
            len: 0,
            fingerprint: Fingerprint::default(),
        }
    }

    pub fn reset(&mut self, flags: SqliFlags) {
        *self = Self::new(self.tokenizer.input(), flags, self.dictionary);
    }

    pub fn input(&self) -> &'a [u8] {
        self.tokenizer.input()
    }

    pub fn flags(&self) -> SqliFlags {
        self.tokenizer.flags()
    }

    pub fn stats(&self) -> &TokenizerStats {
        self.tokenizer.stats()
    }

    /// Rule applications counted while folding.
    pub fn folds(&self) -> usize {
        self.folds
    }

    /// Tokens left after the last [`fold`](Self::fold).
    pub fn tokens(&self) -> &[Token] {
        self.window.as_slice().get(..self.len).unwrap_or_default()
    }

    pub(crate) fn window_mut(&mut self) -> &mut TokenWindow {
        &mut self.window
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        self.len = len;
    }

    pub(crate) fn lookup(&self, namespace: Lookup, key: &[u8]) -> Option<TokenType> {
        self.tokenizer.lookup(namespace, key)
    }

    /// Pulls one token. Comments are parked in `last_comment` instead of
    /// taking a slot; anything else lands at `pos` and clears the parked
    /// comment.
    fn produce_next_token(
        &mut self,
        pos: &mut usize,
        last_comment: &mut Option<Token>,
    ) -> Result<bool, Error> {
        if !self.tokenizer.next_token() {
            return Ok(false);
        }
        let token = *self.tokenizer.current();
        if token.is_type(TokenType::Comment) {
            *last_comment = Some(token);
        } else {
            *last_comment = None;
            self.window.set(*pos, token)?;
            *pos += 1;
        }
        Ok(true)
    }

    /// Folds the whole input and returns the number of significant tokens.
    ///
    /// Zero means the input held nothing but comments, opening parentheses,
    /// type names and unary operators.
    pub fn fold(&mut self) -> Result<usize, Error> {
        let len = self.fold_window()?;
        self.len = len;
        Ok(len)
    }

    fn fold_window(&mut self) -> Result<usize, Error> {
        let mut last_comment: Option<Token> = None;
        let mut more = true;

        // Leading noise has no bearing on the shape.
        while more {
            more = self.tokenizer.next_token();
            let token = self.tokenizer.current();
            let noise = matches!(
                token.token_type,
                TokenType::Comment | TokenType::LeftParenthesis | TokenType::SqlType
            ) || token.is_unary_op();
            if !noise {
                break;
            }
        }
        if !more {
            return Ok(0);
        }
        self.window.set(0, *self.tokenizer.current())?;

        let mut pos = 1;
        let mut left = 0;
        loop {
            if pos >= MAX_TOKENS && self.is_noise_shape()? {
                if pos > MAX_TOKENS {
                    self.window.copy(MAX_TOKENS, 1)?;
                    pos = 2;
                } else {
                    pos = 1;
                }
                left = 0;
                trace!(pos, "fold: five-token noise");
            }

            if !more || left >= MAX_TOKENS {
                left = pos;
                break;
            }

            while more && pos <= MAX_TOKENS && pos - left < 2 {
                more = self.produce_next_token(&mut pos, &mut last_comment)?;
            }
            if pos - left < 2 {
                left = pos;
                continue;
            }

            match self.fold_pair(&mut left, &mut pos)? {
                Flow::Restart => continue,
                Flow::Stop(len) => return Ok(len),
                Flow::Fallthrough => {}
            }

            while more && pos <= MAX_TOKENS && pos - left < 3 {
                more = self.produce_next_token(&mut pos, &mut last_comment)?;
            }
            if pos - left < 3 {
                left = pos;
                continue;
            }

            match self.fold_triple(&mut left, &mut pos)? {
                Flow::Restart => continue,
                Flow::Stop(len) => return Ok(len),
                Flow::Fallthrough => {}
            }

            left += 1;
        }

        // A trailing comment is part of the shape.
        if left < MAX_TOKENS {
            if let Some(comment) = last_comment {
                self.window.set(left, comment)?;
                left += 1;
            }
        }

        // One lookahead token may have been read past the budget.
        Ok(left.min(MAX_TOKENS))
    }

    fn is_noise_shape(&self) -> Result<bool, Error> {
        use TokenType::{Bareword, Comma, LeftParenthesis, Number, Operator, RightParenthesis};

        let mut t = [TokenType::None; MAX_TOKENS];
        for (i, slot) in t.iter_mut().enumerate() {
            *slot = self.window.get(i)?.token_type;
        }
        Ok(matches!(
            t,
            [Number, Operator | Comma, LeftParenthesis, Number, RightParenthesis]
                | [Bareword, Operator, LeftParenthesis, Bareword | Number, RightParenthesis]
                | [Number, RightParenthesis, Comma, LeftParenthesis, Number]
                | [Bareword, RightParenthesis, Operator, LeftParenthesis, Bareword]
        ))
    }

    fn applied(&self, rule: &'static str, left: usize, pos: usize) -> Flow {
        trace!(rule, left, pos, folds = self.folds, "fold");
        Flow::Restart
    }

    fn fold_pair(&mut self, left: &mut usize, pos: &mut usize) -> Result<Flow, Error> {
        use TokenType::{
            Backslash, Bareword, Collate, Evil, Function, Keyword, LeftBrace, LeftParenthesis,
            LogicOperator, Number, Operator, RightBrace, RightParenthesis, Semicolon, SqlType,
            String, Tsql, Variable,
        };

        let a = *self.window.get(*left)?;
        let b = *self.window.get(*left + 1)?;

        // 'foo' 'bar' is valid SQL; one string is enough
        if a.is_type(String) && b.is_type(String) {
            *pos = self.window.remove("string-string", *pos, *left + 1)?;
            self.folds += 1;
            return Ok(self.applied("string-string", *left, *pos));
        }

        if a.is_type(Semicolon) && b.is_type(Semicolon) {
            *pos = self.window.remove("semicolons", *pos, *left + 1)?;
            self.folds += 1;
            return Ok(self.applied("semicolons", *left, *pos));
        }

        if matches!(a.token_type, Operator | LogicOperator) && (b.is_unary_op() || b.is_type(SqlType))
        {
            *pos = self.window.remove("operator-unary", *pos, *left + 1)?;
            self.folds += 1;
            *left = 0;
            return Ok(self.applied("operator-unary", *left, *pos));
        }

        if a.is_type(LeftParenthesis) && b.is_unary_op() {
            *pos = self.window.remove("paren-unary", *pos, *left + 1)?;
            self.folds += 1;
            *left = left.saturating_sub(1);
            return Ok(self.applied("paren-unary", *left, *pos));
        }

        if self.merge_words(*left)? {
            *pos = self.window.remove("merge-words", *pos, *left + 1)?;
            self.folds += 1;
            *left = left.saturating_sub(1);
            return Ok(self.applied("merge-words", *left, *pos));
        }

        // T-SQL `; IF 1=1 ...` is control flow, not a function call
        if a.is_type(Semicolon) && b.is_type(Function) && b.value_eq_ignore_case("IF") {
            self.window.get_mut(*left + 1)?.token_type = Tsql;
            return Ok(self.applied("semicolon-if", *left, *pos));
        }

        if matches!(a.token_type, Bareword | Variable)
            && b.is_type(LeftParenthesis)
            && PSEUDO_FUNCTIONS.iter().any(|w| a.value_eq_ignore_case(w))
        {
            self.window.get_mut(*left)?.token_type = Function;
            return Ok(self.applied("pseudo-function", *left, *pos));
        }

        if a.is_type(Keyword) && (a.value_eq_ignore_case("IN") || a.value_eq_ignore_case("NOT IN")) {
            // `IN (` compares; a bare IN may still merge into IN BOOLEAN MODE
            self.window.get_mut(*left)?.token_type = if b.is_type(LeftParenthesis) {
                Operator
            } else {
                Bareword
            };
            return Ok(self.applied("in-list", *left, *pos));
        }

        if a.is_type(Operator) && (a.value_eq_ignore_case("LIKE") || a.value_eq_ignore_case("NOT LIKE")) {
            if b.is_type(LeftParenthesis) {
                self.window.get_mut(*left)?.token_type = Function;
                trace!(rule = "like-call", left = *left, pos = *pos, "fold");
            }
            return Ok(Flow::Fallthrough);
        }

        if a.is_type(SqlType)
            && matches!(
                b.token_type,
                Bareword | Number | SqlType | LeftParenthesis | Function | Variable | String
            )
        {
            *pos = self.window.remove("sqltype-absorb", *pos, *left)?;
            self.folds += 1;
            *left = 0;
            return Ok(self.applied("sqltype-absorb", *left, *pos));
        }

        if a.is_type(Collate) && b.is_type(Bareword) {
            if !b.value().contains(&b'_') {
                self.window.get_mut(*left + 1)?.token_type = SqlType;
                *left = 0;
                trace!(rule = "collate", left = *left, pos = *pos, "fold");
            }
            return Ok(Flow::Fallthrough);
        }

        if a.is_type(Backslash) {
            if b.is_arithmetic_op() {
                // T-SQL reads `\%1` as `0 % 1`
                self.window.get_mut(*left)?.token_type = Number;
            } else {
                *pos = self.window.remove("backslash", *pos, *left)?;
                self.folds += 1;
            }
            *left = 0;
            return Ok(self.applied("backslash", *left, *pos));
        }

        if (a.is_type(LeftParenthesis) && b.is_type(LeftParenthesis))
            || (a.is_type(RightParenthesis) && b.is_type(RightParenthesis))
        {
            *pos = self.window.remove("double-paren", *pos, *left + 1)?;
            *left = 0;
            self.folds += 1;
            return Ok(self.applied("double-paren", *left, *pos));
        }

        if a.is_type(LeftBrace) && b.is_type(Bareword) {
            // MySQL `{ ``.``.id }` is valid but cannot be told apart here
            if b.len == 0 {
                self.window.get_mut(*left + 1)?.token_type = Evil;
                trace!(rule = "brace-empty", left = *left, "fold: evil");
                return Ok(Flow::Stop(*left + 2));
            }
            // ODBC `{foo expr}` folds to `expr`
            *pos = self.window.remove_range("brace-word", *pos, *left, 2)?;
            *left = 0;
            self.folds += 2;
            return Ok(self.applied("brace-word", *left, *pos));
        }

        if b.is_type(RightBrace) {
            *pos = self.window.remove("right-brace", *pos, *left + 1)?;
            *left = 0;
            self.folds += 1;
            return Ok(self.applied("right-brace", *left, *pos));
        }

        Ok(Flow::Fallthrough)
    }

    fn fold_triple(&mut self, left: &mut usize, pos: &mut usize) -> Result<Flow, Error> {
        use TokenType::{
            Bareword, Comma, Dot, Expression, Function, Group, Keyword, LeftParenthesis,
            LogicOperator, Number, Operator, RightParenthesis, SqlType, String, Variable,
        };

        let a = *self.window.get(*left)?;
        let b = *self.window.get(*left + 1)?;
        let c = *self.window.get(*left + 2)?;
        let (ta, tb, tc) = (a.token_type, b.token_type, c.token_type);

        let drop_two = match (ta, tb, tc) {
            (Number, Operator, Number) => Some("number-op-number"),
            (Operator, t, Operator) if t != LeftParenthesis => Some("op-x-op"),
            (LogicOperator, _, LogicOperator) => Some("logic-x-logic"),
            (Variable, Operator, Variable | Number | Bareword) => Some("var-op-value"),
            (Bareword | Number, Operator, Number | Bareword) => Some("value-op-value"),
            (Bareword | Number | String | Variable, Comma, Number | Bareword | String | Variable) => {
                Some("value-list")
            }
            (Bareword, Dot, Bareword) => Some("qualified-name"),
            _ => None,
        };
        if let Some(rule) = drop_two {
            *pos = self.window.remove_range(rule, *pos, *left + 1, 2)?;
            *left = 0;
            return Ok(self.applied(rule, *left, *pos));
        }

        // PostgreSQL cast: `'1'::int`
        if matches!(ta, Bareword | Number | Variable | String)
            && tb == Operator
            && b.value() == b"::"
            && tc == SqlType
        {
            *pos = self.window.remove_range("cast", *pos, *left + 1, 2)?;
            *left = 0;
            self.folds += 2;
            return Ok(self.applied("cast", *left, *pos));
        }

        let unary = b.is_unary_op();

        // SELECT + (, LIMIT + (
        if matches!(ta, Expression | Group | Comma) && unary && tc == LeftParenthesis {
            *pos = self.window.remove("unary-paren", *pos, *left + 1)?;
            *left = 0;
            return Ok(self.applied("unary-paren", *left, *pos));
        }

        // select - 1
        if matches!(ta, Keyword | Expression | Group)
            && unary
            && matches!(tc, Number | Bareword | Variable | String | Function)
        {
            *pos = self.window.remove("unary-value", *pos, *left + 1)?;
            *left = 0;
            return Ok(self.applied("unary-value", *left, *pos));
        }

        // `1,-1` folds to `1`
        if ta == Comma && unary && matches!(tc, Number | Bareword | Variable | String) {
            *pos = self.window.remove_range("comma-unary-value", *pos, *left, 3)?;
            *left = 0;
            return Ok(self.applied("comma-unary-value", *left, *pos));
        }

        // `1,-sin(1)` keeps the call: `1,sin(1)`
        if ta == Comma && unary && tc == Function {
            *pos = self.window.remove("comma-unary-function", *pos, *left + 1)?;
            *left = 0;
            return Ok(self.applied("comma-unary-function", *left, *pos));
        }

        // select . `foo`
        if ta == Expression && tb == Dot && tc == Bareword {
            *pos = self.window.remove("expression-dot", *pos, *left + 1)?;
            *left = 0;
            return Ok(self.applied("expression-dot", *left, *pos));
        }

        // USER() takes no arguments; USER(foo) is not that function
        if ta == Function && tb == LeftParenthesis && tc != RightParenthesis && a.value_eq_ignore_case("USER")
        {
            self.window.get_mut(*left)?.token_type = Bareword;
            trace!(rule = "user-call", left = *left, pos = *pos, "fold");
        }

        Ok(Flow::Fallthrough)
    }

    /// Joins `left` and `left + 1` into a known phrase such as `UNION ALL`.
    fn merge_words(&mut self, left: usize) -> Result<bool, Error> {
        let a = *self.window.get(left)?;
        let b = *self.window.get(left + 1)?;
        if !a.token_type.merges_left() || !b.token_type.merges_right() {
            return Ok(false);
        }

        let merged_len = a.len + b.len + 1;
        if merged_len >= TOKEN_SIZE {
            return Ok(false);
        }

        let mut merged: SmallVec<[u8; TOKEN_SIZE]> = SmallVec::new();
        merged.extend_from_slice(a.value());
        merged.push(b' ');
        merged.extend_from_slice(b.value());

        let Some(token_type) = self.lookup(Lookup::Word, &merged) else {
            return Ok(false);
        };
        self.window
            .get_mut(left)?
            .assign(token_type, a.pos, merged_len, &merged);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::sqli::StaticDictionary;
    use pretty_assertions::assert_eq;

    fn folded(input: &str, flags: SqliFlags) -> String {
        let mut state = SqliState::new(input.as_bytes(), flags, StaticDictionary::builtin());
        state.fold().unwrap();
        state
            .tokens()
            .iter()
            .map(|t| t.token_type.to_char())
            .collect()
    }

    #[test]
    fn only_noise_folds_to_nothing() {
        assert_eq!(folded("", SqliFlags::empty()), "");
        assert_eq!(folded("((( /* x */ - + ", SqliFlags::empty()), "");
        assert_eq!(folded("/* only */", SqliFlags::empty()), "");
    }

    #[test]
    fn adjacent_strings_collapse() {
        assert_eq!(folded("'a' 'b' 'c'", SqliFlags::empty()), "s");
    }

    #[test]
    fn phrases_merge() {
        let mut state = SqliState::new(
            b"1 union all select",
            SqliFlags::empty(),
            StaticDictionary::builtin(),
        );
        assert_eq!(state.fold().unwrap(), 3);
        let tokens = state.tokens();
        assert_eq!(tokens[1].token_type, TokenType::Union);
        assert_eq!(tokens[1].value(), b"union all");
        assert_eq!(tokens[2].token_type, TokenType::Expression);
        assert_eq!(state.folds(), 1);
    }

    #[test]
    fn arithmetic_collapses_to_one_value() {
        assert_eq!(folded("1+2+3", SqliFlags::empty()), "1");
        assert_eq!(folded("a . b", SqliFlags::empty()), "n");
    }

    #[test]
    fn comma_unary_value_backs_up() {
        assert_eq!(folded("1,-1", SqliFlags::empty()), "1");
    }

    #[test]
    fn semicolon_if_is_control_flow() {
        assert_eq!(folded("1;if(1=1)", SqliFlags::empty()), "1;T(1");
    }

    #[test]
    fn pseudo_function_call() {
        assert_eq!(folded("user()", SqliFlags::empty()), "f()");
        assert_eq!(folded("version()", SqliFlags::empty()), "f()");
    }

    #[test]
    fn in_list_becomes_operator() {
        assert_eq!(folded("in (1)", SqliFlags::empty()), "o(1)");
    }

    #[test]
    fn five_token_noise_shapes_reduce() {
        // n o ( 1 ) is a comparison against a parenthesised value
        assert_eq!(folded("x in (1)", SqliFlags::empty()), "n");
        assert_eq!(folded("1*(2)", SqliFlags::empty()), "1");
    }

    #[test]
    fn trailing_comment_is_kept() {
        assert_eq!(folded("1 -- x", SqliFlags::empty()), "1c");
        assert_eq!(folded("1 /* a */ -- b", SqliFlags::empty()), "1c");
    }

    #[test]
    fn empty_brace_word_is_evil() {
        assert_eq!(folded("{`` 1}", SqliFlags::empty()), "{X");
    }

    #[test]
    fn collate_retypes_plain_names() {
        assert_eq!(folded("x collate latin1", SqliFlags::empty()), "nAt");
        assert_eq!(folded("x collate utf8_bin", SqliFlags::empty()), "nAn");
    }

    #[test]
    fn sql_type_is_absorbed() {
        // leading types are noise
        assert_eq!(folded("int 1", SqliFlags::empty()), "1");
        assert_eq!(folded("x int 1", SqliFlags::empty()), "n1");
        assert_eq!(folded("select int 'a'", SqliFlags::empty()), "Es");
    }

    #[test]
    fn postgres_cast_drops_the_type() {
        assert_eq!(folded("'1'::int", SqliFlags::empty()), "s");
    }

    #[test]
    fn backslash_is_dropped_or_read_as_zero() {
        let mut state = SqliState::new(b"\\1", SqliFlags::empty(), StaticDictionary::builtin());
        assert_eq!(state.fold().unwrap(), 1);
        assert_eq!(state.tokens()[0].token_type, TokenType::Number);
        assert_eq!(state.tokens()[0].value(), b"1");

        let mut state = SqliState::new(b"\\%1", SqliFlags::empty(), StaticDictionary::builtin());
        assert_eq!(state.fold().unwrap(), 1);
        assert_eq!(state.tokens()[0].token_type, TokenType::Number);
        assert_eq!(state.tokens()[0].value(), b"\\");
    }

    #[test]
    fn like_before_paren_is_a_call() {
        assert_eq!(folded("x like (1)", SqliFlags::empty()), "nf(1)");
    }

    #[test]
    fn braces_unwrap() {
        assert_eq!(folded("{foo 1}", SqliFlags::empty()), "1");
        assert_eq!(folded("'a'}", SqliFlags::empty()), "s");
    }

    #[test]
    fn expression_dot_drops_the_dot() {
        assert_eq!(folded("select . `foo`", SqliFlags::empty()), "En");
    }

    #[test]
    fn user_with_arguments_is_a_column() {
        assert_eq!(folded("user(foo)", SqliFlags::empty()), "n(n)");
    }

    #[test]
    fn variable_comparison_collapses() {
        assert_eq!(folded("@a = 1", SqliFlags::empty()), "v");
    }

    #[test]
    fn comma_unary_function_keeps_the_call() {
        assert_eq!(folded("1,-sin(1)", SqliFlags::empty()), "1,f(1");
    }

    #[test]
    fn unary_before_paren_is_dropped() {
        assert_eq!(folded("select + (1)", SqliFlags::empty()), "E(1)");
    }

    #[test]
    fn noise_shape_keeps_the_lookahead_token() {
        // exactly five tokens: the shape alone is replaced by its head
        assert_eq!(folded("1*(2) union select", SqliFlags::empty()), "1UE");

        // a sixth token already read survives next to the head
        let mut state = SqliState::new(b"a) = (in x", SqliFlags::empty(), StaticDictionary::builtin());
        assert_eq!(state.fold().unwrap(), 2);
        let tokens = state.tokens();
        assert_eq!(tokens[0].value(), b"a");
        assert_eq!(tokens[1].token_type, TokenType::Bareword);
        assert_eq!(tokens[1].value(), b"x");
    }

    #[test]
    fn at_most_five_tokens() {
        let mut state = SqliState::new(
            b"a b c d e f g h i j",
            SqliFlags::empty(),
            StaticDictionary::builtin(),
        );
        assert_eq!(state.fold().unwrap(), MAX_TOKENS);
    }
}
