use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data_source::SourceError;

/// Time bucket unit for bar requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timespan {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl Timespan {
    pub const ALL: [Self; 5] = [Self::Minute, Self::Hour, Self::Day, Self::Week, Self::Month];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl Display for Timespan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timespan {
    type Err = SourceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(SourceError::unsupported_parameter(format!(
                "unsupported interval '{other}', expected one of minute, hour, day, week, month"
            ))),
        }
    }
}

/// Bar size: `multiplier` units of `timespan` (e.g. 5 minute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BarInterval {
    pub multiplier: u32,
    pub timespan: Timespan,
}

impl BarInterval {
    pub fn new(multiplier: u32, timespan: Timespan) -> Result<Self, SourceError> {
        if multiplier == 0 {
            return Err(SourceError::unsupported_parameter(
                "interval multiplier must be at least 1",
            ));
        }
        Ok(Self {
            multiplier,
            timespan,
        })
    }

    pub const fn daily() -> Self {
        Self {
            multiplier: 1,
            timespan: Timespan::Day,
        }
    }
}

impl Default for BarInterval {
    fn default() -> Self {
        Self::daily()
    }
}

impl Display for BarInterval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.multiplier, self.timespan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;

    #[test]
    fn parses_timespan() {
        assert_eq!(Timespan::from_str("Day").expect("must parse"), Timespan::Day);
    }

    #[test]
    fn unknown_timespan_is_an_unsupported_parameter() {
        let err = Timespan::from_str("fortnight").expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::UnsupportedParameter);
        assert!(err.message().contains("fortnight"));
    }

    #[test]
    fn zero_multiplier_is_rejected() {
        let err = BarInterval::new(0, Timespan::Minute).expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::UnsupportedParameter);
    }
}
