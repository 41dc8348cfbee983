//! Time ranges
//!
//! A `TimeRange` is a begin/end pair of millisecond timestamps, always UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use crate::errors::{Result, SeriesError};
use crate::time::dt_from_ms;

/// An inclusive range of time expressed in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    begin_ms: i64,
    end_ms: i64,
}

impl TimeRange {
    /// Build a range from two millisecond timestamps.
    pub fn new(begin_ms: i64, end_ms: i64) -> Result<Self> {
        if end_ms < begin_ms {
            return Err(SeriesError::TimeRange(format!(
                "end {end_ms} is earlier in time than begin {begin_ms}"
            )));
        }
        Ok(TimeRange { begin_ms, end_ms })
    }

    /// Build a range from two aware datetimes.
    pub fn from_datetimes(begin: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        TimeRange::new(begin.timestamp_millis(), end.timestamp_millis())
    }

    pub fn begin_ms(&self) -> i64 {
        self.begin_ms
    }

    pub fn end_ms(&self) -> i64 {
        self.end_ms
    }

    pub fn begin(&self) -> Result<DateTime<Utc>> {
        dt_from_ms(self.begin_ms)
    }

    pub fn end(&self) -> Result<DateTime<Utc>> {
        dt_from_ms(self.end_ms)
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.begin_ms
    }

    pub fn contains_ms(&self, t: i64) -> bool {
        self.begin_ms <= t && t <= self.end_ms
    }

    /// True if `other` lies entirely within this range.
    pub fn contains(&self, other: &TimeRange) -> bool {
        self.begin_ms <= other.begin_ms && other.end_ms <= self.end_ms
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.begin_ms <= other.end_ms && other.begin_ms <= self.end_ms
    }

    pub fn disjoint(&self, other: &TimeRange) -> bool {
        !self.overlaps(other)
    }

    /// The smallest range covering both ranges.
    pub fn extents(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            begin_ms: self.begin_ms.min(other.begin_ms),
            end_ms: self.end_ms.max(other.end_ms),
        }
    }

    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        if self.disjoint(other) {
            return None;
        }
        Some(TimeRange {
            begin_ms: self.begin_ms.max(other.begin_ms),
            end_ms: self.end_ms.min(other.end_ms),
        })
    }

    /// The wire form: a two-element `[begin, end]` array.
    pub fn to_json(&self) -> Value {
        json!([self.begin_ms, self.end_ms])
    }

    /// Human-readable UTC form, e.g.
    /// `[Thu, 30 Oct 2003 00:00:00 UTC, Fri, 31 Oct 2003 00:00:00 UTC]`.
    pub fn to_utc_string(&self) -> String {
        match (self.begin(), self.end()) {
            (Ok(b), Ok(e)) => format!(
                "[{}, {}]",
                b.format("%a, %d %b %Y %H:%M:%S UTC"),
                e.format("%a, %d %b %Y %H:%M:%S UTC")
            ),
            _ => format!("[{}, {}]", self.begin_ms, self.end_ms),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_range_rejected() {
        assert!(TimeRange::new(10, 5).is_err());
        assert!(TimeRange::new(5, 5).is_ok());
    }

    #[test]
    fn test_relations() {
        let a = TimeRange::new(0, 100).unwrap();
        let b = TimeRange::new(50, 150).unwrap();
        let c = TimeRange::new(200, 300).unwrap();

        assert!(a.overlaps(&b));
        assert!(a.disjoint(&c));
        assert!(a.contains(&TimeRange::new(10, 20).unwrap()));
        assert!(!a.contains(&b));
        assert_eq!(a.extents(&c), TimeRange::new(0, 300).unwrap());
        assert_eq!(a.intersection(&b), Some(TimeRange::new(50, 100).unwrap()));
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_json_form() {
        let r = TimeRange::new(1_429_673_400_000, 1_429_707_600_000).unwrap();
        assert_eq!(r.to_json(), json!([1_429_673_400_000i64, 1_429_707_600_000i64]));
    }

    #[test]
    fn test_utc_string() {
        let r = TimeRange::new(1_067_472_000_000, 1_067_558_400_000).unwrap();
        assert_eq!(
            r.to_utc_string(),
            "[Thu, 30 Oct 2003 00:00:00 UTC, Fri, 31 Oct 2003 00:00:00 UTC]"
        );
    }
}
