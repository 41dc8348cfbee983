//! Reduction functions
//!
//! A [`Reducer`] folds the raw values of a bucket or event group into one
//! value. Numeric reducers skip invalid values; `First`/`Last` return the
//! first/last valid value of any type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{as_number, is_valid, number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    First,
    Last,
    Median,
    Stdev,
    Difference,
}

impl Reducer {
    /// Apply to the raw values of a group. Returns the missing marker when
    /// the reduction is undefined (no valid values).
    pub fn apply(&self, values: &[Value]) -> Value {
        match self {
            Reducer::First => values.iter().find(|v| is_valid(v)).cloned().unwrap_or(Value::Null),
            Reducer::Last => values
                .iter()
                .rev()
                .find(|v| is_valid(v))
                .cloned()
                .unwrap_or(Value::Null),
            Reducer::Count => {
                Value::from(values.iter().filter(|v| is_valid(v)).count())
            }
            _ => {
                let nums: Vec<f64> = values.iter().filter_map(as_number).collect();
                self.apply_numeric(&nums).map(number).unwrap_or(Value::Null)
            }
        }
    }

    /// Apply to an already-filtered numeric slice.
    pub fn apply_numeric(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            Reducer::Sum => Some(values.iter().sum()),
            Reducer::Avg => Some(values.iter().sum::<f64>() / values.len() as f64),
            Reducer::Min => values.iter().copied().reduce(f64::min),
            Reducer::Max => values.iter().copied().reduce(f64::max),
            Reducer::Count => Some(values.len() as f64),
            Reducer::First => values.first().copied(),
            Reducer::Last => values.last().copied(),
            Reducer::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
                } else {
                    Some(sorted[mid])
                }
            }
            Reducer::Stdev => {
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                    / values.len() as f64;
                Some(variance.sqrt())
            }
            Reducer::Difference => {
                let min = values.iter().copied().reduce(f64::min)?;
                let max = values.iter().copied().reduce(f64::max)?;
                Some(max - min)
            }
        }
    }
}
