//! # Domain Models
//!
//! Canonical entities every provider normalizes into.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Tradable symbol record with optional metadata |
//! | [`Candle`] | One OHLCV bar (epoch-millisecond timestamp) |
//! | [`Symbol`] | Validated, uppercased symbol |
//! | [`BarInterval`] | Multiplier plus [`Timespan`] bar size |
//!
//! Construction validates invariants; anything that fails is rejected by the
//! normalization pipeline record by record.

mod candle;
mod interval;
mod symbol;
mod ticker;
mod timestamp;

pub use candle::{volume_from_f64, volume_from_i64, Candle};
pub use interval::{BarInterval, Timespan};
pub use symbol::Symbol;
pub use ticker::Ticker;
pub use timestamp::{date_to_epoch_ms, epoch_seconds_to_ms, format_date, parse_date, today_utc};
