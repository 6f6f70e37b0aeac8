//! Built-in lookup tables.
//!
//! `KEYWORDS` and `OPERATORS` feed [`StaticDictionary::builtin`]; the type
//! code is the byte shown in fingerprints. `FINGERPRINTS` is the blacklist
//! of folded token shapes. `CHAR_PARSE_MAP` picks the tokenizer routine for
//! the byte under the cursor.
//!
//! [`StaticDictionary::builtin`]: crate::sqli::StaticDictionary::builtin

/// Tokenizer routine selected by the first byte of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharParser {
    White,
    Operator1,
    Operator2,
    Other,
    Char,
    String,
    Hash,
    Money,
    Dash,
    Number,
    Slash,
    Var,
    BString,
    EString,
    NqString,
    QString,
    UString,
    XString,
    BWord,
    Backslash,
    Tick,
    Word,
}

const fn char_parser(b: u8) -> CharParser {
    match b {
        0..=32 | 127 | 160 => CharParser::White,
        b'!' | b'&' | b'*' | b':' | b'<' | b'=' | b'>' | b'|' => CharParser::Operator2,
        b'"' | b'\'' => CharParser::String,
        b'#' => CharParser::Hash,
        b'$' => CharParser::Money,
        b'%' | b'+' | b'^' | b'~' => CharParser::Operator1,
        b'(' | b')' | b',' | b';' | b'{' | b'}' => CharParser::Char,
        b'-' => CharParser::Dash,
        b'.' | b'0'..=b'9' => CharParser::Number,
        b'/' => CharParser::Slash,
        b'?' | b']' => CharParser::Other,
        b'@' => CharParser::Var,
        b'B' | b'b' => CharParser::BString,
        b'E' | b'e' => CharParser::EString,
        b'N' | b'n' => CharParser::NqString,
        b'Q' | b'q' => CharParser::QString,
        b'U' | b'u' => CharParser::UString,
        b'X' | b'x' => CharParser::XString,
        b'[' => CharParser::BWord,
        b'\\' => CharParser::Backslash,
        b'`' => CharParser::Tick,
        _ => CharParser::Word,
    }
}

const fn build_char_parse_map() -> [CharParser; 256] {
    let mut map = [CharParser::Word; 256];
    let mut i = 0;
    while i < 256 {
        map[i] = char_parser(i as u8);
        i += 1;
    }
    map
}

pub(crate) const CHAR_PARSE_MAP: [CharParser; 256] = build_char_parse_map();

/// Two-character operators, looked up before falling back to a single
/// character operator.
pub(crate) const OPERATORS: &[(&str, u8)] = &[
    ("!!", b'o'),
    ("!<", b'o'),
    ("!=", b'o'),
    ("!>", b'o'),
    ("!~", b'o'),
    ("%=", b'o'),
    ("&&", b'&'),
    ("&=", b'o'),
    ("*=", b'o'),
    ("+=", b'o'),
    ("-=", b'o'),
    ("/=", b'o'),
    ("::", b'o'),
    (":=", b'o'),
    ("<<", b'o'),
    ("<=", b'o'),
    ("<>", b'o'),
    ("<@", b'o'),
    (">=", b'o'),
    (">>", b'o'),
    ("@>", b'o'),
    ("^=", b'o'),
    ("|/", b'o'),
    ("|=", b'o'),
    ("||", b'&'),
    ("~*", b'o'),
];

/// Words and merged phrases. Anything absent is a bareword.
pub(crate) const KEYWORDS: &[(&str, u8)] = &[
    // logic
    ("AND", b'&'),
    ("OR", b'&'),
    ("XOR", b'&'),
    // word operators
    ("BETWEEN", b'o'),
    ("BINARY", b'o'),
    ("DIV", b'o'),
    ("GLOB", b'o'),
    ("ILIKE", b'o'),
    ("IS", b'o'),
    ("IS NOT", b'o'),
    ("LIKE", b'o'),
    ("MATCH", b'o'),
    ("MOD", b'o'),
    ("NOT", b'o'),
    ("NOT BETWEEN", b'o'),
    ("NOT LIKE", b'o'),
    ("NOT REGEXP", b'o'),
    ("NOT RLIKE", b'o'),
    ("NOT SIMILAR TO", b'o'),
    ("REGEXP", b'o'),
    ("RLIKE", b'o'),
    ("SIMILAR TO", b'o'),
    ("SOUNDS LIKE", b'o'),
    // set operators
    ("EXCEPT", b'U'),
    ("INTERSECT", b'U'),
    ("MINUS", b'U'),
    ("UNION", b'U'),
    ("UNION ALL", b'U'),
    ("UNION DISTINCT", b'U'),
    ("UNION DISTINCTROW", b'U'),
    // statements
    ("ALTER", b'E'),
    ("CASE", b'E'),
    ("CREATE", b'E'),
    ("DELETE", b'E'),
    ("DELETE FROM", b'E'),
    ("EXPLAIN", b'E'),
    ("INSERT", b'E'),
    ("INSERT INTO", b'E'),
    ("RENAME", b'E'),
    ("REPLACE INTO", b'E'),
    ("SELECT", b'E'),
    ("SELECT ALL", b'E'),
    ("SELECT DISTINCT", b'E'),
    ("SET", b'E'),
    ("TRUNCATE", b'E'),
    ("UPDATE", b'E'),
    ("VALUES", b'E'),
    // grouping
    ("GROUP BY", b'B'),
    ("HAVING", b'B'),
    ("LIMIT", b'B'),
    ("ORDER BY", b'B'),
    ("PROCEDURE ANALYSE", b'B'),
    // keywords
    ("ALL", b'k'),
    ("AS", b'k'),
    ("ASC", b'k'),
    ("BY", b'k'),
    ("CROSS JOIN", b'k'),
    ("DESC", b'k'),
    ("DISTINCT", b'k'),
    ("DROP", b'k'),
    ("ELSE", b'k'),
    ("END", b'k'),
    ("ESCAPE", b'k'),
    ("EXISTS", b'k'),
    ("FOR", b'k'),
    ("FOR UPDATE", b'k'),
    ("FROM", b'k'),
    ("FULL OUTER JOIN", b'k'),
    ("IN", b'k'),
    ("IN BOOLEAN MODE", b'k'),
    ("INDEX", b'k'),
    ("INNER JOIN", b'k'),
    ("INTO", b'k'),
    ("INTO DUMPFILE", b'k'),
    ("INTO OUTFILE", b'k'),
    ("JOIN", b'k'),
    ("LEFT JOIN", b'k'),
    ("LEFT OUTER", b'k'),
    ("LEFT OUTER JOIN", b'k'),
    ("LOCK TABLES", b'k'),
    ("NATURAL JOIN", b'k'),
    ("NOT IN", b'k'),
    ("OFFSET", b'k'),
    ("ON", b'k'),
    ("OUTER JOIN", b'k'),
    ("PROCEDURE", b'k'),
    ("RIGHT JOIN", b'k'),
    ("RIGHT OUTER", b'k'),
    ("RIGHT OUTER JOIN", b'k'),
    ("TABLE", b'k'),
    ("THEN", b'k'),
    ("TOP", b'k'),
    ("WHEN", b'k'),
    ("WHERE", b'k'),
    ("WITH", b'k'),
    ("WITH ROLLUP", b'k'),
    // transact-sql and procedural control
    ("BEGIN", b'T'),
    ("DECLARE", b'T'),
    ("EXEC", b'T'),
    ("EXECUTE", b'T'),
    ("GOTO", b'T'),
    ("SHUTDOWN", b'T'),
    ("WAITFOR", b'T'),
    ("WAITFOR DELAY", b'T'),
    ("WAITFOR RECEIVE", b'T'),
    ("WAITFOR TIME", b'T'),
    ("WHILE", b'T'),
    // functions
    ("ABS", b'f'),
    ("ASCII", b'f'),
    ("BENCHMARK", b'f'),
    ("BIN", b'f'),
    ("CAST", b'f'),
    ("CEIL", b'f'),
    ("CHAR", b'f'),
    ("CHARINDEX", b'f'),
    ("CHAR_LENGTH", b'f'),
    ("CHR", b'f'),
    ("COALESCE", b'f'),
    ("CONCAT", b'f'),
    ("CONCAT_WS", b'f'),
    ("CONVERT", b'f'),
    ("COUNT", b'f'),
    ("DBMS_PIPE.RECEIVE_MESSAGE", b'f'),
    ("DB_NAME", b'f'),
    ("ELT", b'f'),
    ("EXTRACTVALUE", b'f'),
    ("FLOOR", b'f'),
    ("GROUP_CONCAT", b'f'),
    ("HEX", b'f'),
    ("IF", b'f'),
    ("IFNULL", b'f'),
    ("INSTR", b'f'),
    ("ISNULL", b'f'),
    ("LAST_INSERT_ID", b'f'),
    ("LEFT", b'f'),
    ("LENGTH", b'f'),
    ("LOAD_FILE", b'f'),
    ("LOWER", b'f'),
    ("LTRIM", b'f'),
    ("MAKE_SET", b'f'),
    ("MAX", b'f'),
    ("MD5", b'f'),
    ("MID", b'f'),
    ("MIN", b'f'),
    ("NAME_CONST", b'f'),
    ("NOW", b'f'),
    ("NULLIF", b'f'),
    ("ORD", b'f'),
    ("PG_SLEEP", b'f'),
    ("POW", b'f'),
    ("RAND", b'f'),
    ("REPEAT", b'f'),
    ("REPLACE", b'f'),
    ("REVERSE", b'f'),
    ("RIGHT", b'f'),
    ("ROUND", b'f'),
    ("ROW", b'f'),
    ("RTRIM", b'f'),
    ("SCHEMA", b'f'),
    ("SHA1", b'f'),
    ("SIN", b'f'),
    ("SLEEP", b'f'),
    ("SPACE", b'f'),
    ("SUBSTR", b'f'),
    ("SUBSTRING", b'f'),
    ("SUM", b'f'),
    ("SYSDATE", b'f'),
    ("TRIM", b'f'),
    ("UNHEX", b'f'),
    ("UPDATEXML", b'f'),
    ("UPPER", b'f'),
    ("UTL_INADDR.GET_HOST_ADDRESS", b'f'),
    ("VERSION", b'f'),
    ("XP_CMDSHELL", b'f'),
    // variable-like words
    ("CURRENT_DATE", b'v'),
    ("CURRENT_TIME", b'v'),
    ("CURRENT_TIMESTAMP", b'v'),
    ("CURRENT_USER", b'v'),
    ("LOCALTIME", b'v'),
    ("LOCALTIMESTAMP", b'v'),
    ("NULL", b'1'),
    ("SESSION_USER", b'v'),
    ("SYSTEM_USER", b'v'),
    ("TRUE", b'1'),
    ("FALSE", b'1'),
    // types
    ("BIGINT", b't'),
    ("BLOB", b't'),
    ("BOOLEAN", b't'),
    ("CHARACTER", b't'),
    ("DATE", b't'),
    ("DATETIME", b't'),
    ("DECIMAL", b't'),
    ("DOUBLE", b't'),
    ("FLOAT", b't'),
    ("INT", b't'),
    ("INTEGER", b't'),
    ("MEDIUMINT", b't'),
    ("NCHAR", b't'),
    ("NUMERIC", b't'),
    ("NVARCHAR", b't'),
    ("REAL", b't'),
    ("SIGNED", b't'),
    ("SMALLINT", b't'),
    ("TEXT", b't'),
    ("TIMESTAMP", b't'),
    ("TINYINT", b't'),
    ("UNSIGNED", b't'),
    ("VARCHAR", b't'),
    // misc
    ("COLLATE", b'A'),
];

/// Folded token shapes known to be injections. Stored without the upstream
/// version prefix.
pub(crate) const FINGERPRINTS: &[&str] = &[
    // single-token collapse
    "X",
    // string contexts
    "s&1",
    "s&1c",
    "s&1o",
    "s&1os",
    "s&f(",
    "s&f()",
    "s&f(1",
    "s&f(s",
    "s&(1",
    "s&(s",
    "s&1UE",
    "s&n",
    "s&nc",
    "s&no",
    "s&s",
    "s&sc",
    "s&so",
    "s&sos",
    "s&v",
    "s&vos",
    "s)&1",
    "s)&s",
    "s)&(1",
    "s)&(s",
    "s)&f(",
    "s)UE",
    "s);E",
    "s;E",
    "s;E1",
    "s;Ef(",
    "s;Ek",
    "s;En",
    "s;T",
    "s;T1",
    "s;Ts",
    "s;Tsc",
    "s;kkn",
    "s;kk1",
    "sUE",
    "sUE1",
    "sUE1,",
    "sUE1c",
    "sUEf",
    "sUEn",
    "sUEnk",
    "sUEok",
    "sUEs",
    "sUEv",
    "sc",
    "so1",
    "so1c",
    "sof(",
    "sof(1",
    "sos",
    "sosc",
    "sov",
    "s;Tf(",
    "sokn",
    "sk1",
    "sB1",
    "sB1c",
    "sBn",
    "sEn",
    "s1c",
    // number contexts
    "1&(1",
    "1&(1)",
    "1&1",
    "1&1c",
    "1&1o",
    "1&1o1",
    "1&1UE",
    "1&f(",
    "1&f()",
    "1&f(1",
    "1&f(s",
    "1&n",
    "1&nc",
    "1&s",
    "1&sc",
    "1&v",
    "1&vc",
    "1)&(1",
    "1)&1",
    "1)&f(",
    "1)UE",
    "1);E",
    "1;E",
    "1;E1",
    "1;Ef(",
    "1;Ek",
    "1;En",
    "1;T",
    "1;T1",
    "1;Tn",
    "1;Ts",
    "1;Tsc",
    "1;Tf(",
    "1;kkn",
    "1;kk1",
    "1;kn",
    "1B1",
    "1B1c",
    "1Bn",
    "1U",
    "1UE",
    "1UE1",
    "1UE1,",
    "1UE1c",
    "1UEf",
    "1UEf(",
    "1UEn",
    "1UEnk",
    "1UEok",
    "1UEs",
    "1UEv",
    "1c",
    "1o1c",
    "1of(",
    "1of(1",
    "1ovc",
    "1kn",
    "1k1",
    // bareword contexts
    "n&1",
    "n&1c",
    "n&f(",
    "n&f(1",
    "n&n",
    "n&nc",
    "n&s",
    "n&v",
    "n)UE",
    "n;E",
    "n;kkn",
    "n;T",
    "nUE",
    "nUE1",
    "nUEn",
    "nUEnk",
    "nUEok",
    "nUE1,",
    "nUE1c",
    "nc",
    "novc",
    "nof(",
    "nB1",
    // keyword and expression starts
    "E1",
    "E1c",
    "Ef(",
    "Ef()",
    "Ef(1)",
    "En&1",
    "Enk",
    "Enkn",
    "Enknk",
    "Evk",
    "Ek1",
    "T1",
    "Tf(",
    "Tf(1)",
    "Tn",
    "Tnc",
    "Ts",
    "Tvo",
    "f(",
    "f()",
    "f(1)",
    "f(1)c",
    "f(n)",
    "f(s)",
    "v&1",
    "v&s",
    "vUE",
    "vUEn",
    "vc",
    "&1",
    "&f(",
    "&s",
    "&sos",
    ")&1",
    ")UE",
    "(1)",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_map_dispatch() {
        assert_eq!(CHAR_PARSE_MAP[0], CharParser::White);
        assert_eq!(CHAR_PARSE_MAP[b' ' as usize], CharParser::White);
        assert_eq!(CHAR_PARSE_MAP[0xA0], CharParser::White);
        assert_eq!(CHAR_PARSE_MAP[127], CharParser::White);
        assert_eq!(CHAR_PARSE_MAP[b'\'' as usize], CharParser::String);
        assert_eq!(CHAR_PARSE_MAP[b'7' as usize], CharParser::Number);
        assert_eq!(CHAR_PARSE_MAP[b'.' as usize], CharParser::Number);
        assert_eq!(CHAR_PARSE_MAP[b'q' as usize], CharParser::QString);
        assert_eq!(CHAR_PARSE_MAP[b'a' as usize], CharParser::Word);
        assert_eq!(CHAR_PARSE_MAP[b'_' as usize], CharParser::Word);
        assert_eq!(CHAR_PARSE_MAP[0xC3], CharParser::Word);
        assert_eq!(CHAR_PARSE_MAP[b']' as usize], CharParser::Other);
    }

    #[test]
    fn blacklist_is_free_of_benign_shapes() {
        for benign in ["Eoknk", "ns", "s", "n", "nn", "no", "1", "1s1s1", "nsn"] {
            assert!(!FINGERPRINTS.contains(&benign), "{benign} must not be blacklisted");
        }
    }

    #[test]
    fn fingerprints_fit_the_window() {
        for fp in FINGERPRINTS {
            assert!(!fp.is_empty() && fp.len() <= 5, "{fp}");
        }
    }
}
