use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data_source::SourceError;

/// Canonical provider identifiers accepted by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Yfinance,
    Polygon,
    AlphaVantage,
    Sec,
    Cboe,
}

impl ProviderId {
    pub const ALL: [Self; 5] = [
        Self::Yfinance,
        Self::Polygon,
        Self::AlphaVantage,
        Self::Sec,
        Self::Cboe,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yfinance => "yfinance",
            Self::Polygon => "polygon",
            Self::AlphaVantage => "alpha_vantage",
            Self::Sec => "sec",
            Self::Cboe => "cboe",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = SourceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yfinance" => Ok(Self::Yfinance),
            "polygon" => Ok(Self::Polygon),
            "alpha_vantage" => Ok(Self::AlphaVantage),
            "sec" => Ok(Self::Sec),
            "cboe" => Ok(Self::Cboe),
            _ => Err(SourceError::unknown_provider(value.trim())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;

    #[test]
    fn parses_registered_names_case_insensitively() {
        assert_eq!(ProviderId::from_str("Polygon").expect("known"), ProviderId::Polygon);
        assert_eq!(
            ProviderId::from_str(" alpha_vantage ").expect("known"),
            ProviderId::AlphaVantage
        );
    }

    #[test]
    fn unknown_name_is_reported_with_its_value() {
        let err = ProviderId::from_str("bloomberg").expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::UnknownProvider);
        assert!(err.message().contains("bloomberg"));
    }

    #[test]
    fn names_round_trip_through_display() {
        for id in ProviderId::ALL {
            assert_eq!(ProviderId::from_str(&id.to_string()).expect("round trip"), id);
        }
    }
}
