//! Windowing strategies
//!
//! A [`WindowSpec`] buckets events by either a fixed duration (`"1d"`,
//! `"30s"`, …) or a named calendar granularity. Bucket keys are index
//! strings resolved through the [`Index`] model. Fixed-duration buckets are
//! always UTC-aligned; calendar buckets honor the configured [`TimeMode`].

use serde::{Deserialize, Serialize};

use timeflux_types::{window_duration_ms, Index, TimeMode};

use crate::error::{ProcessorError, Result};

/// The windowing strategy for collector-backed stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSpec {
    /// One bucket spanning the whole stream.
    Global,
    /// Fixed-size UTC-aligned buckets, keyed `"<label>-<count>"`.
    Fixed { label: String, duration_ms: i64 },
    Daily,
    Monthly,
    Yearly,
}

/// The bucket key of the global window.
pub const GLOBAL_WINDOW_KEY: &str = "global";

impl WindowSpec {
    /// A fixed window from a duration label such as `"1d"` or `"30s"`.
    pub fn fixed(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let duration_ms = window_duration_ms(&label)
            .map_err(|e| ProcessorError::Config(format!("window: {e}")))?;
        Ok(WindowSpec::Fixed { label, duration_ms })
    }

    /// Parse `"daily"`, `"monthly"`, `"yearly"`, `"global"` or a duration
    /// label.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "global" => Ok(WindowSpec::Global),
            "daily" => Ok(WindowSpec::Daily),
            "monthly" => Ok(WindowSpec::Monthly),
            "yearly" => Ok(WindowSpec::Yearly),
            label => WindowSpec::fixed(label),
        }
    }

    pub fn is_windowed(&self) -> bool {
        !matches!(self, WindowSpec::Global)
    }

    /// The bucket key containing `ts_ms`.
    pub fn index_string(&self, ts_ms: i64, mode: TimeMode) -> Result<String> {
        let key = match self {
            WindowSpec::Global => GLOBAL_WINDOW_KEY.to_string(),
            // fixed windows ignore the mode: no local-time variant is
            // meaningful for a fixed-size bucket
            WindowSpec::Fixed { label, .. } => Index::get_index_string(label, ts_ms)
                .map_err(ProcessorError::Series)?,
            WindowSpec::Daily => {
                Index::get_daily_index_string(ts_ms, mode).map_err(ProcessorError::Series)?
            }
            WindowSpec::Monthly => {
                Index::get_monthly_index_string(ts_ms, mode).map_err(ProcessorError::Series)?
            }
            WindowSpec::Yearly => {
                Index::get_yearly_index_string(ts_ms, mode).map_err(ProcessorError::Series)?
            }
        };
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_fixed_window_keys() {
        let spec = WindowSpec::fixed("1d").unwrap();
        assert_eq!(
            spec.index_string(1_067_472_000_500, TimeMode::Utc).unwrap(),
            "1d-12355"
        );

        // fixed windows ignore the time mode
        let local = TimeMode::Local(FixedOffset::east_opt(3600).unwrap());
        assert_eq!(
            spec.index_string(1_067_472_000_500, local).unwrap(),
            "1d-12355"
        );
    }

    #[test]
    fn test_calendar_window_keys() {
        // 2014-09-17 00:00:30 UTC
        let ts = 1_410_825_630_000;
        assert_eq!(
            WindowSpec::Daily.index_string(ts, TimeMode::Utc).unwrap(),
            "2014-09-17"
        );
        assert_eq!(
            WindowSpec::Monthly.index_string(ts, TimeMode::Utc).unwrap(),
            "2014-09"
        );
        assert_eq!(
            WindowSpec::Yearly.index_string(ts, TimeMode::Utc).unwrap(),
            "2014"
        );

        // thirty seconds past UTC midnight is still the previous day one
        // hour west of Greenwich
        let west = TimeMode::Local(FixedOffset::west_opt(3600).unwrap());
        assert_eq!(
            WindowSpec::Daily.index_string(ts, west).unwrap(),
            "2014-09-16"
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(WindowSpec::parse("daily").unwrap(), WindowSpec::Daily);
        assert_eq!(WindowSpec::parse("global").unwrap(), WindowSpec::Global);
        assert_eq!(
            WindowSpec::parse("30s").unwrap(),
            WindowSpec::Fixed {
                label: "30s".to_string(),
                duration_ms: 30_000
            }
        );
        assert!(WindowSpec::parse("bogus").is_err());
    }
}
