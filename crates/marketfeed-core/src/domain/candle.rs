use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// One OHLCV bar. The symbol and interval are carried by the request that
/// produced the sequence, not by the bar itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// Unix epoch milliseconds, UTC.
    pub timestamp: i64,
}

impl Candle {
    pub const FIELD_NAMES: [&'static str; 6] = ["open", "high", "low", "close", "volume", "timestamp"];

    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
        timestamp: i64,
    ) -> Result<Self, ValidationError> {
        validate_finite("open", open)?;
        validate_finite("high", high)?;
        validate_finite("low", low)?;
        validate_finite("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidCandleRange);
        }

        Ok(Self {
            open,
            high,
            low,
            close,
            volume,
            timestamp,
        })
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.open.to_string(),
            self.high.to_string(),
            self.low.to_string(),
            self.close.to_string(),
            self.volume.to_string(),
            self.timestamp.to_string(),
        ]
    }
}

/// Converts an upstream floating volume into the canonical integer volume.
pub fn volume_from_f64(value: f64) -> Result<u64, ValidationError> {
    validate_finite("volume", value)?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field: "volume" });
    }
    Ok(value.round() as u64)
}

/// Converts an upstream signed volume into the canonical integer volume.
pub fn volume_from_i64(value: i64) -> Result<u64, ValidationError> {
    u64::try_from(value).map_err(|_| ValidationError::NegativeValue { field: "volume" })
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}
