use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};

use crate::ValidationError;

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<Date, ValidationError> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).map_err(|_| {
        ValidationError::InvalidDate {
            value: value.to_owned(),
        }
    })
}

/// Formats a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Midnight UTC of `date` as Unix epoch milliseconds.
pub fn date_to_epoch_ms(date: Date) -> i64 {
    let midnight = date.with_time(Time::MIDNIGHT).assume_utc();
    midnight.unix_timestamp() * 1_000
}

/// Converts Unix epoch seconds to milliseconds, rejecting values `time` cannot represent.
pub fn epoch_seconds_to_ms(seconds: i64) -> Result<i64, ValidationError> {
    OffsetDateTime::from_unix_timestamp(seconds)
        .map(|ts| ts.unix_timestamp() * 1_000)
        .map_err(|_| ValidationError::InvalidTimestamp {
            value: seconds.to_string(),
        })
}

/// Today's date in UTC.
pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_maps_to_utc_midnight_millis() {
        let date = parse_date("2024-01-02").expect("valid date");
        assert_eq!(date_to_epoch_ms(date), 1_704_153_600_000);
        assert_eq!(format_date(date), "2024-01-02");
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(matches!(
            parse_date("02/01/2024"),
            Err(ValidationError::InvalidDate { .. })
        ));
    }

    #[test]
    fn seconds_scale_to_millis() {
        assert_eq!(epoch_seconds_to_ms(1_704_153_600).expect("valid"), 1_704_153_600_000);
        assert!(epoch_seconds_to_ms(i64::MAX).is_err());
    }
}
