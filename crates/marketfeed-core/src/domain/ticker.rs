use serde::{Deserialize, Serialize};

use crate::Symbol;

/// Canonical tradable-symbol record shared by every provider.
///
/// Optional fields are `None` when the source does not report them;
/// `optionable: None` means "unknown", not "not optionable".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: Symbol,
    pub name: Option<String>,
    pub active: bool,
    pub market: Option<String>,
    pub locale: Option<String>,
    pub primary_exchange: Option<String>,
    pub asset_type: Option<String>,
    pub currency: Option<String>,
    pub cik: Option<String>,
    pub last_updated_utc: Option<String>,
    pub optionable: Option<bool>,
    pub market_cap: Option<i64>,
}

impl Ticker {
    /// Column order used by sinks that flatten tickers into rows.
    pub const FIELD_NAMES: [&'static str; 12] = [
        "symbol",
        "name",
        "active",
        "market",
        "locale",
        "primaryExchange",
        "assetType",
        "currency",
        "cik",
        "lastUpdatedUtc",
        "optionable",
        "marketCap",
    ];

    pub fn new(symbol: Symbol, active: bool) -> Self {
        Self {
            symbol,
            name: None,
            active,
            market: None,
            locale: None,
            primary_exchange: None,
            asset_type: None,
            currency: None,
            cik: None,
            last_updated_utc: None,
            optionable: None,
            market_cap: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_optionable(mut self, optionable: bool) -> Self {
        self.optionable = Some(optionable);
        self
    }

    pub fn with_market_cap(mut self, market_cap: i64) -> Self {
        self.market_cap = Some(market_cap);
        self
    }

    /// Copies every populated field of `metadata` onto `self`.
    ///
    /// The symbol is identity and is never replaced; `None` fields in
    /// `metadata` leave the existing values untouched.
    pub fn overlay(&mut self, metadata: &Ticker) {
        fn take(target: &mut Option<String>, source: &Option<String>) {
            if let Some(value) = source {
                *target = Some(value.clone());
            }
        }

        take(&mut self.name, &metadata.name);
        self.active = metadata.active;
        take(&mut self.market, &metadata.market);
        take(&mut self.locale, &metadata.locale);
        take(&mut self.primary_exchange, &metadata.primary_exchange);
        take(&mut self.asset_type, &metadata.asset_type);
        take(&mut self.currency, &metadata.currency);
        take(&mut self.cik, &metadata.cik);
        take(&mut self.last_updated_utc, &metadata.last_updated_utc);
        if metadata.optionable.is_some() {
            self.optionable = metadata.optionable;
        }
        if metadata.market_cap.is_some() {
            self.market_cap = metadata.market_cap;
        }
    }

    /// Values in [`Ticker::FIELD_NAMES`] order, with `None` rendered empty.
    pub fn to_row(&self) -> Vec<String> {
        fn opt(value: &Option<String>) -> String {
            value.clone().unwrap_or_default()
        }

        vec![
            self.symbol.to_string(),
            opt(&self.name),
            self.active.to_string(),
            opt(&self.market),
            opt(&self.locale),
            opt(&self.primary_exchange),
            opt(&self.asset_type),
            opt(&self.currency),
            opt(&self.cik),
            opt(&self.last_updated_utc),
            self.optionable.map(|v| v.to_string()).unwrap_or_default(),
            self.market_cap.map(|v| v.to_string()).unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(value: &str) -> Symbol {
        Symbol::parse(value).expect("valid symbol")
    }

    #[test]
    fn overlay_replaces_only_populated_fields() {
        let mut base = Ticker::new(symbol("AAPL"), true).with_name("Apple Inc.");
        base.primary_exchange = Some(String::from("XNAS"));

        let mut metadata = Ticker::new(symbol("AAPL"), true).with_market_cap(3_000_000_000_000);
        metadata.currency = Some(String::from("usd"));

        base.overlay(&metadata);

        assert_eq!(base.name.as_deref(), Some("Apple Inc."));
        assert_eq!(base.primary_exchange.as_deref(), Some("XNAS"));
        assert_eq!(base.currency.as_deref(), Some("usd"));
        assert_eq!(base.market_cap, Some(3_000_000_000_000));
        assert_eq!(base.optionable, None);
    }

    #[test]
    fn serializes_with_canonical_field_names() {
        let ticker = Ticker::new(symbol("NA"), false).with_optionable(true);
        let value = serde_json::to_value(&ticker).expect("serializes");

        for field in Ticker::FIELD_NAMES {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(value["symbol"], "NA");
        assert_eq!(value["optionable"], true);
        assert!(value["marketCap"].is_null());
    }

    #[test]
    fn row_matches_field_order() {
        let ticker = Ticker::new(symbol("MSFT"), true).with_market_cap(42);
        let row = ticker.to_row();
        assert_eq!(row.len(), Ticker::FIELD_NAMES.len());
        assert_eq!(row[0], "MSFT");
        assert_eq!(row[2], "true");
        assert_eq!(row[10], "");
        assert_eq!(row[11], "42");
    }
}
