//! Keyword, operator and fingerprint lookup.
//!
//! The detector never builds this data; it only asks questions of a
//! [`Dictionary`]. [`StaticDictionary::builtin`] is the table shipped with the
//! crate, and [`StaticDictionary::from_json`] accepts tables in the
//! `sqlparse_data.json` layout.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::sqli::sqli_data;
use crate::sqli::TokenType;
#[cfg(feature = "json")]
use crate::Error;

/// Which table a lookup is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    /// Words and multi-word phrases ("SELECT", "UNION ALL").
    Word,
    /// Two-character operators (`!=`, `||`, `::`).
    Operator,
    /// Fingerprint blacklist. A hit is reported as `TokenType::Fingerprint`.
    Fingerprint,
}

/// Read-only classification data.
///
/// Keys are already ASCII-uppercased by the caller.
pub trait Dictionary: Send + Sync {
    fn lookup(&self, namespace: Lookup, key: &[u8]) -> Option<TokenType>;
}

impl<D: Dictionary + ?Sized> Dictionary for &D {
    fn lookup(&self, namespace: Lookup, key: &[u8]) -> Option<TokenType> {
        (**self).lookup(namespace, key)
    }
}

impl<D: Dictionary + ?Sized> Dictionary for std::sync::Arc<D> {
    fn lookup(&self, namespace: Lookup, key: &[u8]) -> Option<TokenType> {
        (**self).lookup(namespace, key)
    }
}

/// Hash-table backed dictionary.
#[derive(Debug, Clone, Default)]
pub struct StaticDictionary {
    words: HashMap<Vec<u8>, TokenType>,
    operators: HashMap<Vec<u8>, TokenType>,
    fingerprints: HashSet<Vec<u8>>,
}

static BUILTIN: OnceLock<StaticDictionary> = OnceLock::new();

impl StaticDictionary {
    /// The dictionary compiled into the crate.
    pub fn builtin() -> &'static StaticDictionary {
        BUILTIN.get_or_init(|| {
            let mut builder = StaticDictionary::builder();
            for &(word, code) in sqli_data::KEYWORDS {
                if let Some(t) = TokenType::from_byte(code) {
                    builder = builder.word(word, t);
                }
            }
            for &(op, code) in sqli_data::OPERATORS {
                if let Some(t) = TokenType::from_byte(code) {
                    builder = builder.operator(op, t);
                }
            }
            for &fp in sqli_data::FINGERPRINTS {
                builder = builder.fingerprint(fp);
            }
            builder.build()
        })
    }

    pub fn builder() -> DictionaryBuilder {
        DictionaryBuilder::default()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn fingerprint_count(&self) -> usize {
        self.fingerprints.len()
    }

    /// Loads `{"keywords": {"WORD": "k", ...}, "fingerprints": ["s&sos", ...]}`.
    ///
    /// Keywords that are two punctuation characters are filed as operators,
    /// since the JSON layout keeps both in one map. Fingerprints may carry a
    /// leading `0` version prefix.
    #[cfg(feature = "json")]
    pub fn from_json(data: &str) -> Result<Self, Error> {
        #[derive(serde::Deserialize)]
        struct Raw {
            keywords: HashMap<String, String>,
            #[serde(default)]
            fingerprints: Vec<String>,
        }

        let raw: Raw =
            serde_json::from_str(data).map_err(|e| Error::Dictionary(e.to_string()))?;

        let mut builder = StaticDictionary::builder();
        for (key, code) in &raw.keywords {
            let t = match code.as_bytes() {
                [b] => TokenType::from_byte(*b),
                _ => None,
            }
            .ok_or_else(|| Error::Dictionary(format!("bad type code {code:?} for {key:?}")))?;

            if t == TokenType::Fingerprint {
                builder = builder.fingerprint(key.strip_prefix('0').unwrap_or(key));
            } else if key.len() == 2 && !key.bytes().any(|b| b.is_ascii_alphanumeric()) {
                builder = builder.operator(key, t);
            } else {
                builder = builder.word(key, t);
            }
        }
        for fp in &raw.fingerprints {
            builder = builder.fingerprint(fp.strip_prefix('0').unwrap_or(fp));
        }
        Ok(builder.build())
    }
}

impl Dictionary for StaticDictionary {
    fn lookup(&self, namespace: Lookup, key: &[u8]) -> Option<TokenType> {
        match namespace {
            Lookup::Word => self.words.get(key).copied(),
            Lookup::Operator => self.operators.get(key).copied(),
            Lookup::Fingerprint => self
                .fingerprints
                .contains(key)
                .then_some(TokenType::Fingerprint),
        }
    }
}

/// Assembles a [`StaticDictionary`]; handy for small test fixtures.
#[derive(Debug, Default)]
pub struct DictionaryBuilder {
    inner: StaticDictionary,
}

impl DictionaryBuilder {
    pub fn word(mut self, word: &str, token_type: TokenType) -> Self {
        self.inner
            .words
            .insert(word.to_ascii_uppercase().into_bytes(), token_type);
        self
    }

    pub fn operator(mut self, op: &str, token_type: TokenType) -> Self {
        self.inner
            .operators
            .insert(op.to_ascii_uppercase().into_bytes(), token_type);
        self
    }

    pub fn fingerprint(mut self, fingerprint: &str) -> Self {
        self.inner
            .fingerprints
            .insert(fingerprint.to_ascii_uppercase().into_bytes());
        self
    }

    pub fn build(self) -> StaticDictionary {
        self.inner
    }
}
