use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 20;

/// Exchange ticker symbol, 1 to 20 characters of `A-Z 0-9 . - / ^ = + _`.
///
/// `NA` is an ordinary symbol here, never a missing-value marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

const fn is_symbol_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '/' | '^' | '=' | '+' | '_')
}

impl Symbol {
    /// Trims and uppercases `input`, then checks length and characters.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let upper = input.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        let len = upper.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong { len, max: MAX_SYMBOL_LEN });
        }
        if let Some((index, ch)) = upper.chars().enumerate().find(|(_, ch)| !is_symbol_char(*ch)) {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }
        Ok(Self(upper))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_symbol() {
        let parsed = Symbol::parse(" aapl ").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "AAPL");
    }

    #[test]
    fn keeps_na_as_a_real_symbol() {
        let parsed = Symbol::parse("na").expect("NA is a listed ticker");
        assert_eq!(parsed.as_str(), "NA");
    }

    #[test]
    fn accepts_share_class_and_index_punctuation() {
        assert_eq!(Symbol::parse("brk.b").expect("class share").as_str(), "BRK.B");
        assert_eq!(Symbol::parse("^gspc").expect("index").as_str(), "^GSPC");
    }

    #[test]
    fn rejects_empty_and_invalid_chars() {
        assert!(matches!(Symbol::parse("   "), Err(ValidationError::EmptySymbol)));
        let err = Symbol::parse("AAPL$").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidChar { ch: '$', index: 4 }));
    }

    #[test]
    fn rejects_overlong_symbols() {
        let err = Symbol::parse("ABCDEFGHIJKLMNOPQRSTU").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolTooLong { len: 21, max: 20 }));
    }
}
