//! Record-level validation and mapping into the canonical entities.
//!
//! Adapters describe each upstream row as a [`TickerFields`] or
//! [`CandleFields`] table. Converting a table either yields a canonical
//! entity or a [`Rejection`] naming the record key; [`Normalized`] collects
//! both, logging every rejection once at `warn` and never aborting the batch.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    date_to_epoch_ms, volume_from_f64, Candle, ProviderId, Symbol, Ticker, ValidationError,
};

/// A record dropped by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Symbol or date identifying the offending record.
    pub key: String,
    pub error: ValidationError,
}

impl Rejection {
    pub fn new(key: impl Into<String>, error: ValidationError) -> Self {
        Self {
            key: key.into(),
            error,
        }
    }
}

/// Accepted records plus the rejections encountered while producing them.
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    provider: ProviderId,
    entity: &'static str,
    pub records: Vec<T>,
    pub rejected: Vec<Rejection>,
}

impl<T> Normalized<T> {
    pub fn new(provider: ProviderId, entity: &'static str) -> Self {
        Self {
            provider,
            entity,
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Accepts one mapped record, or logs and keeps the rejection.
    pub fn push(&mut self, outcome: Result<T, Rejection>) {
        match outcome {
            Ok(record) => self.records.push(record),
            Err(rejection) => {
                warn!(
                    provider = %self.provider,
                    key = %rejection.key,
                    error = %rejection.error,
                    "skipping invalid {} record",
                    self.entity
                );
                self.rejected.push(rejection);
            }
        }
    }

    pub fn extend<I>(&mut self, outcomes: I)
    where
        I: IntoIterator<Item = Result<T, Rejection>>,
    {
        for outcome in outcomes {
            self.push(outcome);
        }
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

/// Maps a raw batch through `map`, keeping valid records in input order.
pub fn normalize_batch<R, T, F>(
    provider: ProviderId,
    entity: &'static str,
    raw: impl IntoIterator<Item = R>,
    map: F,
) -> Normalized<T>
where
    F: FnMut(R) -> Result<T, Rejection>,
{
    let mut normalized = Normalized::new(provider, entity);
    normalized.extend(raw.into_iter().map(map));
    normalized
}

/// Decodes one raw JSON record into a typed row.
///
/// A field of the wrong type rejects only this record, under `key`.
pub fn decode_record<T: DeserializeOwned>(key: impl Into<String>, raw: Value) -> Result<T, Rejection> {
    serde_json::from_value(raw).map_err(|error| {
        Rejection::new(
            key,
            ValidationError::MalformedRecord {
                detail: error.to_string(),
            },
        )
    })
}

/// Reads the identifying field of a raw record for rejection messages.
pub fn record_key(raw: &Value, field: &str) -> String {
    match raw.get(field) {
        Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_owned(),
        Some(Value::Number(number)) => number.to_string(),
        _ => format!("<missing {field}>"),
    }
}

/// Removes repeated symbols; the first occurrence wins.
pub fn dedupe_tickers(provider: ProviderId, tickers: Vec<Ticker>) -> Vec<Ticker> {
    let mut seen = HashSet::with_capacity(tickers.len());
    let before = tickers.len();
    let unique: Vec<Ticker> = tickers
        .into_iter()
        .filter(|ticker| seen.insert(ticker.symbol.clone()))
        .collect();

    if unique.len() < before {
        debug!(
            provider = %provider,
            dropped = before - unique.len(),
            "dropped duplicate symbols"
        );
    }
    unique
}

/// Source-neutral ticker field table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerFields {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub active: Option<bool>,
    pub market: Option<String>,
    pub locale: Option<String>,
    pub primary_exchange: Option<String>,
    pub asset_type: Option<String>,
    pub currency: Option<String>,
    pub cik: Option<String>,
    pub last_updated_utc: Option<String>,
    pub optionable: Option<bool>,
    pub market_cap: Option<f64>,
}

impl TickerFields {
    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Self::default()
        }
    }

    fn key(&self) -> String {
        self.symbol
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("<missing symbol>")
            .to_owned()
    }

    pub fn into_ticker(self) -> Result<Ticker, Rejection> {
        let key = self.key();
        self.validate().map_err(|error| Rejection::new(key, error))
    }

    fn validate(self) -> Result<Ticker, ValidationError> {
        let raw_symbol = self
            .symbol
            .ok_or(ValidationError::MissingField { field: "symbol" })?;
        let symbol = Symbol::parse(&raw_symbol)?;
        let active = self
            .active
            .ok_or(ValidationError::MissingField { field: "active" })?;
        let market_cap = self
            .market_cap
            .map(|value| whole_number("marketCap", value))
            .transpose()?;

        let mut ticker = Ticker::new(symbol, active);
        ticker.name = clean(self.name);
        ticker.market = clean(self.market);
        ticker.locale = clean(self.locale);
        ticker.primary_exchange = clean(self.primary_exchange);
        ticker.asset_type = clean(self.asset_type);
        ticker.currency = clean(self.currency);
        ticker.cik = clean(self.cik);
        ticker.last_updated_utc = clean(self.last_updated_utc);
        ticker.optionable = self.optionable;
        ticker.market_cap = market_cap;
        Ok(ticker)
    }
}

/// Source-neutral candle field table.
///
/// `key` is the date or timestamp string used in rejection warnings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleFields {
    pub key: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub timestamp: Option<i64>,
}

impl CandleFields {
    pub fn into_candle(self) -> Result<Candle, Rejection> {
        let key = self.key.clone();
        self.validate().map_err(|error| Rejection::new(key, error))
    }

    fn validate(self) -> Result<Candle, ValidationError> {
        let open = self.open.ok_or(ValidationError::MissingField { field: "open" })?;
        let high = self.high.ok_or(ValidationError::MissingField { field: "high" })?;
        let low = self.low.ok_or(ValidationError::MissingField { field: "low" })?;
        let close = self.close.ok_or(ValidationError::MissingField { field: "close" })?;
        let volume = self
            .volume
            .ok_or(ValidationError::MissingField { field: "volume" })
            .and_then(volume_from_f64)?;
        let timestamp = self
            .timestamp
            .ok_or(ValidationError::MissingField { field: "timestamp" })?;

        Candle::new(open, high, low, close, volume, timestamp)
    }
}

/// Parses a numeric text cell. Missing-value cells should be filtered out by
/// the caller beforehand; anything unparsable here is a validation error.
pub fn parse_number(field: &'static str, value: &str) -> Result<f64, ValidationError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidNumber {
            field,
            value: value.to_owned(),
        })
}

/// Optional variant of [`parse_number`] over a possibly missing cell.
pub fn parse_optional_number(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<f64>, ValidationError> {
    value.map(|cell| parse_number(field, cell)).transpose()
}

/// Builds candle fields from a `YYYY-MM-DD` row of text cells.
pub fn daily_text_row(
    date: &str,
    open: &str,
    high: &str,
    low: &str,
    close: &str,
    volume: &str,
) -> Result<CandleFields, Rejection> {
    let key = date.trim().to_owned();
    let parse = || -> Result<CandleFields, ValidationError> {
        let day = crate::parse_date(date)?;
        Ok(CandleFields {
            key: key.clone(),
            open: Some(parse_number("open", open)?),
            high: Some(parse_number("high", high)?),
            low: Some(parse_number("low", low)?),
            close: Some(parse_number("close", close)?),
            volume: Some(parse_number("volume", volume)?),
            timestamp: Some(date_to_epoch_ms(day)),
        })
    };
    parse().map_err(|error| Rejection::new(key.clone(), error))
}

fn whole_number(field: &'static str, value: f64) -> Result<i64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(value.round() as i64)
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, close: &str) -> Result<CandleFields, Rejection> {
        daily_text_row(date, "10", "12", "9", close, "1000")
    }

    #[test]
    fn non_numeric_close_rejects_only_that_row() {
        let rows = vec![
            row("2024-01-02", "11"),
            row("2024-01-03", "11.5"),
            row("2024-01-04", "abc"),
            row("2024-01-05", "10.75"),
        ];

        let normalized = normalize_batch(ProviderId::AlphaVantage, "candle", rows, |row| {
            row.and_then(CandleFields::into_candle)
        });

        assert_eq!(normalized.records.len(), 3);
        assert_eq!(normalized.rejected.len(), 1);
        assert_eq!(normalized.rejected[0].key, "2024-01-04");
        assert!(matches!(
            normalized.rejected[0].error,
            ValidationError::InvalidNumber { field: "close", .. }
        ));
    }

    #[test]
    fn date_rows_map_to_utc_midnight() {
        let candle = row("2024-01-02", "11")
            .and_then(CandleFields::into_candle)
            .expect("valid row");
        assert_eq!(candle.timestamp, 1_704_153_600_000);
    }

    #[test]
    fn ticker_requires_symbol_and_active() {
        let missing_active = TickerFields::symbol("AAPL").into_ticker().expect_err("must fail");
        assert_eq!(missing_active.key, "AAPL");
        assert_eq!(
            missing_active.error,
            ValidationError::MissingField { field: "active" }
        );

        let missing_symbol = TickerFields {
            active: Some(true),
            ..TickerFields::default()
        }
        .into_ticker()
        .expect_err("must fail");
        assert_eq!(missing_symbol.key, "<missing symbol>");
    }

    #[test]
    fn ticker_fields_are_trimmed_and_blank_values_dropped() {
        let ticker = TickerFields {
            symbol: Some(String::from(" brk.b ")),
            name: Some(String::from("  Berkshire  ")),
            active: Some(true),
            currency: Some(String::from("   ")),
            market_cap: Some(1_000.4),
            ..TickerFields::default()
        }
        .into_ticker()
        .expect("valid");

        assert_eq!(ticker.symbol.as_str(), "BRK.B");
        assert_eq!(ticker.name.as_deref(), Some("Berkshire"));
        assert_eq!(ticker.currency, None);
        assert_eq!(ticker.market_cap, Some(1_000));
    }

    #[test]
    fn nan_market_cap_is_rejected() {
        let error = TickerFields {
            market_cap: Some(f64::NAN),
            active: Some(true),
            ..TickerFields::symbol("MSFT")
        }
        .into_ticker()
        .expect_err("must fail");
        assert_eq!(
            error.error,
            ValidationError::NonFiniteValue { field: "marketCap" }
        );
    }

    #[derive(Debug, serde::Deserialize)]
    struct Bar {
        #[serde(default)]
        c: Option<f64>,
    }

    #[test]
    fn wrong_typed_json_field_rejects_only_that_record() {
        let raw = vec![
            serde_json::json!({"t": 1, "c": 10.5}),
            serde_json::json!({"t": 2, "c": "abc"}),
            serde_json::json!({"c": 11.0}),
        ];

        let normalized = normalize_batch(ProviderId::Polygon, "candle", raw, |value| {
            let key = record_key(&value, "t");
            decode_record::<Bar>(key, value)
        });

        assert_eq!(normalized.records.len(), 2);
        assert_eq!(normalized.rejected.len(), 1);
        assert_eq!(normalized.rejected[0].key, "2");
        assert!(matches!(
            normalized.rejected[0].error,
            ValidationError::MalformedRecord { .. }
        ));
        assert_eq!(record_key(&serde_json::json!({}), "ticker"), "<missing ticker>");
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let first = Ticker::new(Symbol::parse("AAPL").expect("valid"), true).with_name("first");
        let second = Ticker::new(Symbol::parse("AAPL").expect("valid"), false).with_name("second");
        let other = Ticker::new(Symbol::parse("MSFT").expect("valid"), true);

        let unique = dedupe_tickers(ProviderId::Polygon, vec![first, other, second]);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].name.as_deref(), Some("first"));
        assert_eq!(unique[1].symbol.as_str(), "MSFT");
    }
}
