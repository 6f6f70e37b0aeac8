use proptest::prelude::*;

use crate::{detect_sqli, fingerprint, tokenize, SqliFlags, TokenType};

fn any_flags() -> impl Strategy<Value = SqliFlags> {
    (0u32..32).prop_map(SqliFlags::from_bits_truncate)
}

/// Bytes biased towards the characters the tokenizer cares about.
fn sqlish() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..128),
        "[a-zA-Z0-9 '\"`=<>!@#$()*/;,.:|&+-]{0,96}".prop_map(String::into_bytes),
    ]
}

proptest! {
    #[test]
    fn detection_always_returns_a_verdict(input in sqlish()) {
        prop_assert!(detect_sqli(&input).is_ok());
    }

    #[test]
    fn fingerprints_stay_short(input in sqlish(), flags in any_flags()) {
        let fp = fingerprint(&input, flags).unwrap();
        prop_assert!(fp.len() <= 6);
        prop_assert!(fp.as_str().is_ascii());
    }

    #[test]
    fn retokenizing_is_identical(input in sqlish(), flags in any_flags()) {
        let first: Vec<_> = tokenize(&input, flags).collect();
        let second: Vec<_> = tokenize(&input, flags).collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn tokens_lie_inside_the_input(input in sqlish(), flags in any_flags()) {
        for token in tokenize(&input, flags) {
            prop_assert!(token.pos <= input.len());
            prop_assert!(token.len < crate::sqli::TOKEN_SIZE);
        }
    }

    #[test]
    fn quoted_body_round_trips(
        delim in prop_oneof![Just(b'\''), Just(b'"'), Just(b'`')],
        body in "[a-zA-Z0-9 =<>()*,.;-]{0,30}",
    ) {
        let mut input = vec![delim];
        input.extend_from_slice(body.as_bytes());
        input.push(delim);

        let tokens: Vec<_> = tokenize(&input, SqliFlags::empty()).collect();
        prop_assert_eq!(tokens.len(), 1);
        let token = &tokens[0];
        if delim == b'`' {
            // quoted identifiers name a column or a known function
            prop_assert!(matches!(token.token_type, TokenType::Bareword | TokenType::Function));
        } else {
            prop_assert_eq!(token.token_type, TokenType::String);
        }
        prop_assert_eq!(token.value(), body.as_bytes());
        prop_assert_eq!(token.str_open, delim);
        prop_assert_eq!(token.str_close, delim);
    }
}
