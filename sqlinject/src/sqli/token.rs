use core::fmt;

/// Maximum stored token value, including room for the terminator the
/// fixed-size buffer reserves.
pub const TOKEN_SIZE: usize = 32;

/// Sentinel for "no delimiter".
pub const CHAR_NULL: u8 = b'\0';

/// Classification of a token.
///
/// Every variant maps to a single byte: the byte that appears in a
/// fingerprint and in dictionary data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenType {
    #[default]
    None,
    Keyword,
    Union,
    Group,
    Expression,
    SqlType,
    Function,
    Bareword,
    Number,
    Variable,
    String,
    Operator,
    LogicOperator,
    Comment,
    Collate,
    LeftParenthesis,
    RightParenthesis,
    LeftBrace,
    RightBrace,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Tsql,
    Unknown,
    Evil,
    Fingerprint,
    Backslash,
}

impl TokenType {
    pub const fn as_byte(self) -> u8 {
        match self {
            TokenType::None => CHAR_NULL,
            TokenType::Keyword => b'k',
            TokenType::Union => b'U',
            TokenType::Group => b'B',
            TokenType::Expression => b'E',
            TokenType::SqlType => b't',
            TokenType::Function => b'f',
            TokenType::Bareword => b'n',
            TokenType::Number => b'1',
            TokenType::Variable => b'v',
            TokenType::String => b's',
            TokenType::Operator => b'o',
            TokenType::LogicOperator => b'&',
            TokenType::Comment => b'c',
            TokenType::Collate => b'A',
            TokenType::LeftParenthesis => b'(',
            TokenType::RightParenthesis => b')',
            TokenType::LeftBrace => b'{',
            TokenType::RightBrace => b'}',
            TokenType::Dot => b'.',
            TokenType::Comma => b',',
            TokenType::Colon => b':',
            TokenType::Semicolon => b';',
            TokenType::Tsql => b'T',
            TokenType::Unknown => b'?',
            TokenType::Evil => b'X',
            TokenType::Fingerprint => b'F',
            TokenType::Backslash => b'\\',
        }
    }

    /// Inverse of [`TokenType::as_byte`]. Returns `None` for bytes that are
    /// not a type code (including `0`).
    pub const fn from_byte(b: u8) -> Option<Self> {
        let t = match b {
            b'k' => TokenType::Keyword,
            b'U' => TokenType::Union,
            b'B' => TokenType::Group,
            b'E' => TokenType::Expression,
            b't' => TokenType::SqlType,
            b'f' => TokenType::Function,
            b'n' => TokenType::Bareword,
            b'1' => TokenType::Number,
            b'v' => TokenType::Variable,
            b's' => TokenType::String,
            b'o' => TokenType::Operator,
            b'&' => TokenType::LogicOperator,
            b'c' => TokenType::Comment,
            b'A' => TokenType::Collate,
            b'(' => TokenType::LeftParenthesis,
            b')' => TokenType::RightParenthesis,
            b'{' => TokenType::LeftBrace,
            b'}' => TokenType::RightBrace,
            b'.' => TokenType::Dot,
            b',' => TokenType::Comma,
            b':' => TokenType::Colon,
            b';' => TokenType::Semicolon,
            b'T' => TokenType::Tsql,
            b'?' => TokenType::Unknown,
            b'X' => TokenType::Evil,
            b'F' => TokenType::Fingerprint,
            b'\\' => TokenType::Backslash,
            _ => return None,
        };
        Some(t)
    }

    pub const fn to_char(self) -> char {
        self.as_byte() as char
    }

    /// Types word-merge accepts on the left of a phrase.
    pub(crate) const fn merges_left(self) -> bool {
        matches!(
            self,
            TokenType::Keyword
                | TokenType::Bareword
                | TokenType::Operator
                | TokenType::Union
                | TokenType::Function
                | TokenType::Expression
                | TokenType::Tsql
                | TokenType::SqlType
        )
    }

    /// Types word-merge accepts on the right of a phrase.
    pub(crate) const fn merges_right(self) -> bool {
        self.merges_left() || matches!(self, TokenType::LogicOperator)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A classified lexical unit.
///
/// The value is a copy of at most `TOKEN_SIZE - 1` bytes of the input;
/// longer runs are truncated and `len` reports the stored length.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    /// Byte offset in the input.
    pub pos: usize,
    pub len: usize,
    /// Number of `@` sigils for variables (0, 1 or 2).
    pub var_count: u8,
    /// Opening delimiter actually used, or `CHAR_NULL`.
    pub str_open: u8,
    /// Closing delimiter actually used, or `CHAR_NULL` when unterminated.
    pub str_close: u8,
    val: [u8; TOKEN_SIZE],
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

impl Token {
    pub const fn new() -> Self {
        Self {
            token_type: TokenType::None,
            pos: 0,
            len: 0,
            var_count: 0,
            str_open: CHAR_NULL,
            str_close: CHAR_NULL,
            val: [0; TOKEN_SIZE],
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Sets type, position and value. Delimiters and the variable count are
    /// left alone so callers can set them before or after.
    pub(crate) fn assign(&mut self, token_type: TokenType, pos: usize, len: usize, value: &[u8]) {
        let last = len.min(TOKEN_SIZE - 1).min(value.len());
        self.token_type = token_type;
        self.pos = pos;
        self.len = last;
        self.val = [0; TOKEN_SIZE];
        if let (Some(dst), Some(src)) = (self.val.get_mut(..last), value.get(..last)) {
            dst.copy_from_slice(src);
        }
    }

    pub(crate) fn assign_char(&mut self, token_type: TokenType, pos: usize, ch: u8) {
        self.assign(token_type, pos, 1, &[ch]);
    }

    pub fn is_none(&self) -> bool {
        self.token_type == TokenType::None
    }

    pub fn value(&self) -> &[u8] {
        self.val.get(..self.len).unwrap_or_default()
    }

    pub fn value_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.value())
    }

    /// First byte of the value, `CHAR_NULL` when empty.
    pub fn first_byte(&self) -> u8 {
        self.value().first().copied().unwrap_or(CHAR_NULL)
    }

    pub fn value_eq_ignore_case(&self, word: &str) -> bool {
        self.value().eq_ignore_ascii_case(word.as_bytes())
    }

    pub fn is_type(&self, token_type: TokenType) -> bool {
        self.token_type == token_type
    }

    /// `+ - ! ~ !! NOT`
    pub fn is_unary_op(&self) -> bool {
        if self.token_type != TokenType::Operator {
            return false;
        }
        match self.value() {
            [b'+' | b'-' | b'!' | b'~'] => true,
            [b'!', b'!'] => true,
            v if v.len() == 3 => v.eq_ignore_ascii_case(b"NOT"),
            _ => false,
        }
    }

    /// Single character `* / - + %`
    pub fn is_arithmetic_op(&self) -> bool {
        self.token_type == TokenType::Operator
            && matches!(self.value(), [b'*' | b'/' | b'-' | b'+' | b'%'])
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("type", &self.token_type.to_char())
            .field("pos", &self.pos)
            .field("val", &self.value_lossy())
            .field("open", &(self.str_open as char))
            .field("close", &(self.str_close as char))
            .field("count", &self.var_count)
            .finish()
    }
}

/// Renders `type value` as in the token fixtures: strings keep
/// their delimiters and variables get their `@` sigils back.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.token_type.to_char())?;
        match self.token_type {
            TokenType::String => {
                if self.str_open != CHAR_NULL {
                    write!(f, "{}", self.str_open as char)?;
                }
                write!(f, "{}", self.value_lossy())?;
                if self.str_close != CHAR_NULL {
                    write!(f, "{}", self.str_close as char)?;
                }
                Ok(())
            }
            TokenType::Variable => {
                for _ in 0..self.var_count {
                    f.write_str("@")?;
                }
                write!(f, "{}", self.value_lossy())
            }
            _ => write!(f, "{}", self.value_lossy()),
        }
    }
}
