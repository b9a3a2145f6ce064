use thiserror::Error;

/// Per-record schema violations raised while normalizing upstream rows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("required field '{field}' is missing")]
    MissingField { field: &'static str },
    #[error("field '{field}' has invalid value '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("record has an unexpected shape: {detail}")]
    MalformedRecord { detail: String },

    #[error("candle high must be >= low")]
    InvalidCandleRange,

    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("timestamp '{value}' is out of range")]
    InvalidTimestamp { value: String },
}

/// Top-level error type for core helpers that are not provider calls.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("delimited text error: {0}")]
    Delimited(#[from] csv::Error),
}
