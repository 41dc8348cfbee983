//! Calendar and duration-count bucket indexes
//!
//! An `Index` is a string-encoded range of time: either a calendar bucket
//! (`"2015"`, `"2015-07"`, `"2015-07-14"`) or a duration-count bucket
//! (`"1d-12355"`, `"5m-4135541"`). The string is resolved exactly once at
//! construction into a concrete UTC millisecond range. There is no
//! local-time range representation: a [`TimeMode`] only controls how the
//! string is interpreted.

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use std::fmt;

use crate::errors::{Result, SeriesError};
use crate::range::TimeRange;
use crate::time::{dt_from_ms, window_duration_ms, TimeMode, SECOND_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum IndexKind {
    Duration,
    Year,
    Month,
    Day,
}

/// A string-encoded time bucket with its resolved UTC range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Index {
    string: String,
    range: TimeRange,
    kind: IndexKind,
}

impl Index {
    /// Parse an index string, interpreting calendar forms in UTC.
    pub fn new(s: &str) -> Result<Self> {
        Index::with_mode(s, TimeMode::Utc)
    }

    /// Parse an index string, interpreting calendar forms per `mode`.
    ///
    /// Duration-count forms are unaffected by the mode. The stored range is
    /// always UTC.
    pub fn with_mode(s: &str, mode: TimeMode) -> Result<Self> {
        if matches!(mode, TimeMode::Local(_)) {
            tracing::warn!(index = s, "interpreting calendar index in local time");
        }

        let (range, kind) = Index::resolve(s, mode)?;
        Ok(Index {
            string: s.to_string(),
            range,
            kind,
        })
    }

    fn resolve(s: &str, mode: TimeMode) -> Result<(TimeRange, IndexKind)> {
        let bad = || SeriesError::Index(s.to_string());
        let parts: Vec<&str> = s.split('-').collect();

        match parts.as_slice() {
            [year] => {
                if year.len() != 4 {
                    return Err(bad());
                }
                let y: i32 = year.parse().map_err(|_| bad())?;
                let begin = NaiveDate::from_ymd_opt(y, 1, 1).ok_or_else(bad)?;
                let next = NaiveDate::from_ymd_opt(y + 1, 1, 1).ok_or_else(bad)?;
                Ok((calendar_range(begin, next, mode)?, IndexKind::Year))
            }
            [first, second] if first.len() == 4 && first.chars().all(|c| c.is_ascii_digit()) => {
                let y: i32 = first.parse().map_err(|_| bad())?;
                let m: u32 = second.parse().map_err(|_| bad())?;
                let begin = NaiveDate::from_ymd_opt(y, m, 1).ok_or_else(bad)?;
                let next = if m == 12 {
                    NaiveDate::from_ymd_opt(y + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(y, m + 1, 1)
                }
                .ok_or_else(bad)?;
                Ok((calendar_range(begin, next, mode)?, IndexKind::Month))
            }
            [window, count] => {
                let duration = window_duration_ms(window).map_err(|_| bad())?;
                let count: i64 = count.parse().map_err(|_| bad())?;
                let begin = duration.checked_mul(count).ok_or_else(bad)?;
                Ok((TimeRange::new(begin, begin + duration)?, IndexKind::Duration))
            }
            [year, month, day] => {
                if year.len() != 4 {
                    return Err(bad());
                }
                let y: i32 = year.parse().map_err(|_| bad())?;
                let m: u32 = month.parse().map_err(|_| bad())?;
                let d: u32 = day.parse().map_err(|_| bad())?;
                let begin = NaiveDate::from_ymd_opt(y, m, d).ok_or_else(bad)?;
                let next = begin.succ_opt().ok_or_else(bad)?;
                Ok((calendar_range(begin, next, mode)?, IndexKind::Day))
            }
            _ => Err(bad()),
        }
    }

    pub fn as_string(&self) -> &str {
        &self.string
    }

    pub fn as_timerange(&self) -> TimeRange {
        self.range
    }

    pub fn begin_ms(&self) -> i64 {
        self.range.begin_ms()
    }

    pub fn end_ms(&self) -> i64 {
        self.range.end_ms()
    }

    /// The wire form: just the string.
    pub fn to_json(&self) -> Value {
        Value::String(self.string.clone())
    }

    /// Calendar indexes rendered for humans; duration indexes are returned
    /// verbatim. An optional chrono format string overrides the default
    /// rendering for date-based indexes.
    pub fn to_nice_string(&self, fmt: Option<&str>) -> String {
        let date = match self.range.begin() {
            Ok(dt) => dt.date_naive(),
            Err(_) => return self.string.clone(),
        };
        if let Some(fmt) = fmt {
            if self.kind != IndexKind::Duration {
                return date.format(fmt).to_string();
            }
        }
        match self.kind {
            IndexKind::Duration => self.string.clone(),
            IndexKind::Year => format!("{}", date.year()),
            IndexKind::Month => date.format("%B").to_string(),
            IndexKind::Day => date.format("%B %-d %Y").to_string(),
        }
    }

    /// The window duration of a duration-count index string, `None` for
    /// calendar indexes.
    pub fn window_duration(s: &str) -> Option<i64> {
        let prefix = s.split('-').next()?;
        window_duration_ms(prefix).ok()
    }

    /// The duration-count index string covering `ts_ms` for a fixed window
    /// label such as `"5m"`. Fixed windows are always UTC-aligned.
    pub fn get_index_string(window: &str, ts_ms: i64) -> Result<String> {
        let duration = window_duration_ms(window)?;
        Ok(format!("{}-{}", window, ts_ms.div_euclid(duration)))
    }

    /// The `"YYYY-MM-DD"` bucket containing `ts_ms`.
    pub fn get_daily_index_string(ts_ms: i64, mode: TimeMode) -> Result<String> {
        let date = civil_date(ts_ms, mode)?;
        Ok(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        ))
    }

    /// The `"YYYY-MM"` bucket containing `ts_ms`.
    pub fn get_monthly_index_string(ts_ms: i64, mode: TimeMode) -> Result<String> {
        let date = civil_date(ts_ms, mode)?;
        Ok(format!("{:04}-{:02}", date.year(), date.month()))
    }

    /// The `"YYYY"` bucket containing `ts_ms`.
    pub fn get_yearly_index_string(ts_ms: i64, mode: TimeMode) -> Result<String> {
        let date = civil_date(ts_ms, mode)?;
        Ok(format!("{:04}", date.year()))
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string)
    }
}

/// Resolve a calendar period to a UTC range. The end is the last whole
/// second of the period, matching the sibling implementation's wire output.
fn calendar_range(begin: NaiveDate, next: NaiveDate, mode: TimeMode) -> Result<TimeRange> {
    let begin_ms = midnight_ms(begin, mode)?;
    let next_ms = midnight_ms(next, mode)?;
    TimeRange::new(begin_ms, next_ms - SECOND_MS)
}

fn midnight_ms(date: NaiveDate, mode: TimeMode) -> Result<i64> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| SeriesError::Index(date.to_string()))?;
    let ms = match mode {
        TimeMode::Utc => Utc.from_utc_datetime(&naive).timestamp_millis(),
        TimeMode::Local(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| SeriesError::Index(date.to_string()))?
            .timestamp_millis(),
    };
    Ok(ms)
}

fn civil_date(ts_ms: i64, mode: TimeMode) -> Result<NaiveDate> {
    let dt = dt_from_ms(ts_ms)?;
    Ok(match mode {
        TimeMode::Utc => dt.date_naive(),
        TimeMode::Local(offset) => dt.with_timezone(&offset).date_naive(),
    })
}
