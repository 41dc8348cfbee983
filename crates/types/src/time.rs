//! Time conversion helpers
//!
//! All stored timestamps in this crate are integer milliseconds since the
//! UNIX epoch, in UTC. Conversions from `chrono` types round down to
//! millisecond granularity exactly once, at construction; nothing is ever
//! re-rounded. Timezone-naive datetimes are unrepresentable at this API:
//! constructors take `DateTime<Utc>` or `DateTime<FixedOffset>`.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use crate::errors::{Result, SeriesError};

pub const SECOND_MS: i64 = 1_000;
pub const MINUTE_MS: i64 = 60 * SECOND_MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// How calendar bucket boundaries are interpreted.
///
/// This is the single local-rendering knob: there is no ambient process
/// timezone anywhere in the crate. `Local` carries an explicit fixed offset
/// and only affects how calendar strings and bucket boundaries are read;
/// stored ranges are always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMode {
    Utc,
    Local(FixedOffset),
}

impl Default for TimeMode {
    fn default() -> Self {
        TimeMode::Utc
    }
}

/// Milliseconds since epoch for any timezone-aware datetime.
pub fn ms_from_dt<Tz: TimeZone>(dt: &DateTime<Tz>) -> i64 {
    dt.timestamp_millis()
}

/// UTC datetime for a millisecond timestamp.
pub fn dt_from_ms(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or(SeriesError::Timestamp(ms))
}

/// Normalize an aware datetime to UTC.
///
/// Non-UTC offsets are accepted but logged: callers that feed local-time
/// stamps almost always meant to convert further upstream.
pub fn sanitize(dt: &DateTime<FixedOffset>) -> DateTime<Utc> {
    if dt.offset().local_minus_utc() != 0 {
        tracing::warn!(
            offset_seconds = dt.offset().local_minus_utc(),
            "non-UTC timestamp normalized to UTC"
        );
    }
    dt.with_timezone(&Utc)
}

/// Parse a window duration label such as `"30s"`, `"5m"`, `"6h"` or `"1d"`.
pub fn window_duration_ms(label: &str) -> Result<i64> {
    let bad = || SeriesError::Config(format!("bad window duration: {label}"));

    let mut chars = label.chars();
    let unit = chars.next_back().ok_or_else(bad)?;
    let count: i64 = chars.as_str().parse().map_err(|_| bad())?;

    if count <= 0 {
        return Err(bad());
    }

    let unit_ms = match unit {
        's' => SECOND_MS,
        'm' => MINUTE_MS,
        'h' => HOUR_MS,
        'd' => DAY_MS,
        _ => return Err(bad()),
    };

    Ok(count * unit_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_round_trip_ms() {
        let ms = 1_400_425_947_000;
        let dt = dt_from_ms(ms).unwrap();
        assert_eq!(ms_from_dt(&dt), ms);
    }

    #[test]
    fn test_sub_millisecond_precision_dropped() {
        let dt = Utc.with_ymd_and_hms(2015, 7, 14, 0, 0, 0).unwrap()
            + chrono::Duration::microseconds(1_500);
        assert_eq!(ms_from_dt(&dt) % 1000, 1);
    }

    #[test]
    fn test_sanitize_offset() {
        let offset = FixedOffset::west_opt(8 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2016, 8, 22, 0, 0, 30).unwrap();
        let utc = sanitize(&local);
        assert_eq!(utc.timestamp(), local.timestamp());
    }

    #[test]
    fn test_window_duration_parsing() {
        assert_eq!(window_duration_ms("30s").unwrap(), 30_000);
        assert_eq!(window_duration_ms("5m").unwrap(), 300_000);
        assert_eq!(window_duration_ms("6h").unwrap(), 21_600_000);
        assert_eq!(window_duration_ms("1d").unwrap(), 86_400_000);

        assert!(window_duration_ms("").is_err());
        assert!(window_duration_ms("5x").is_err());
        assert!(window_duration_ms("-1d").is_err());
        assert!(window_duration_ms("d").is_err());
    }
}
