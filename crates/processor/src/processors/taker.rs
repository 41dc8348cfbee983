//! Head-N limiting per window and group

use timeflux_types::{Event, FieldPath, TimeMode};

use crate::error::Result;
use crate::stage::Processor;
use crate::window::WindowSpec;

/// A processor that passes at most `limit` events per (window, group)
/// bucket and drops the rest.
pub struct Taker {
    name: String,
    limit: usize,
    window: WindowSpec,
    mode: TimeMode,
    group_by: Option<FieldPath>,
    counts: Vec<(String, usize)>,
}

impl Taker {
    pub fn new(
        limit: usize,
        window: WindowSpec,
        mode: TimeMode,
        group_by: Option<FieldPath>,
    ) -> Self {
        Taker {
            name: "take".to_string(),
            limit,
            window,
            mode,
            group_by,
            counts: Vec::new(),
        }
    }

    fn bucket_key(&self, event: &Event) -> Result<String> {
        let window_key = self.window.index_string(event.timestamp_ms(), self.mode)?;
        let group = self
            .group_by
            .as_ref()
            .and_then(|path| event.get(path))
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        Ok(match group {
            Some(group) => format!("{window_key}::{group}"),
            None => window_key,
        })
    }
}

impl Processor for Taker {
    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        let key = self.bucket_key(&event)?;
        let count = match self.counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => {
                *n += 1;
                *n
            }
            None => {
                self.counts.push((key, 1));
                1
            }
        };

        if count <= self.limit {
            Ok(vec![event])
        } else {
            Ok(Vec::new())
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_takes_per_window() {
        let mut taker = Taker::new(2, WindowSpec::fixed("1m").unwrap(), TimeMode::Utc, None);
        let mut out = Vec::new();
        for i in 0..4 {
            out.extend(
                taker
                    .process(Event::at_ms(i * 10_000, json!({"value": i})))
                    .unwrap(),
            );
        }
        // two from the first minute, none after, next minute starts fresh
        out.extend(
            taker
                .process(Event::at_ms(61_000, json!({"value": 9})))
                .unwrap(),
        );
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].get("value"), Some(&json!(9)));
    }

    #[test]
    fn test_takes_globally_without_window() {
        let mut taker = Taker::new(3, WindowSpec::Global, TimeMode::Utc, None);
        let mut out = Vec::new();
        for i in 0..10 {
            out.extend(
                taker
                    .process(Event::at_ms(i, json!({"value": i})))
                    .unwrap(),
            );
        }
        assert_eq!(out.len(), 3);
    }
}
