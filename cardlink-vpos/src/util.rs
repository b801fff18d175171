//! Small formatting and randomness helpers shared by the payment flows.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use rand::distributions::{Alphanumeric, DistString};

/// Returns `length` random ASCII letters and digits from the OS generator.
#[must_use]
pub fn random_alphanumeric(length: usize) -> String {
    Alphanumeric.sample_string(&mut rand::rngs::OsRng, length)
}

/// Formats an amount in minor units as a decimal with two places.
///
/// # Examples
///
/// ```
/// use cardlink_vpos::util::decimal_amount;
///
/// assert_eq!(decimal_amount(1050), "10.50");
/// assert_eq!(decimal_amount(7), "0.07");
/// ```
#[must_use]
pub fn decimal_amount(minor: u64) -> String {
    format!("{}.{:02}", minor / 100, minor % 100)
}

/// `YYYYMMDDhhmmss` on a 24-hour clock, used to make settlement order ids
/// unique.
#[must_use]
pub fn timestamp_24h(now: NaiveDateTime) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// `YYYYMMDDhhmmss` on a 12-hour clock, as the redirect gateway expects.
#[must_use]
pub fn timestamp_12h(now: NaiveDateTime) -> String {
    now.format("%Y%m%d%I%M%S").to_string()
}

/// Wall-clock time of `instant` in `zone`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use chrono_tz::Tz;
/// use cardlink_vpos::util::wall_clock;
///
/// let instant = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
/// assert_eq!(wall_clock(instant, Tz::Europe__Athens).to_string(), "2025-01-15 12:00:00");
/// ```
#[must_use]
pub fn wall_clock(instant: DateTime<Utc>, zone: Tz) -> NaiveDateTime {
    instant.with_timezone(&zone).naive_local()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    fn afternoon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap().and_hms_opt(15, 4, 5).unwrap()
    }

    #[test]
    fn test_random_alphanumeric() {
        let value = random_alphanumeric(40);
        assert_eq!(value.len(), 40);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(value, random_alphanumeric(40));
    }

    #[test]
    fn test_decimal_amount() {
        assert_eq!(decimal_amount(0), "0.00");
        assert_eq!(decimal_amount(100), "1.00");
        assert_eq!(decimal_amount(249_999), "2499.99");
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(timestamp_24h(afternoon()), "20250309150405");
        assert_eq!(timestamp_12h(afternoon()), "20250309030405");
    }

    #[test]
    fn test_wall_clock_follows_daylight_saving() {
        let summer = Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap();
        let winter = Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap();
        assert_eq!(timestamp_24h(wall_clock(summer, Tz::Europe__Athens)), "20250701130000");
        assert_eq!(timestamp_24h(wall_clock(winter, Tz::Europe__Athens)), "20251201120000");
        assert_eq!(timestamp_24h(wall_clock(winter, Tz::UTC)), "20251201100000");
    }
}
