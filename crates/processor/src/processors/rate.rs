//! Derivative rates from consecutive event pairs
//!
//! Each consecutive pair of instant-keyed events produces one range-keyed
//! event spanning the pair, carrying `<field>_rate` values in units per
//! second. Callers typically align first for evenly spaced rates.

use serde_json::{Map, Value};

use timeflux_types::{as_number, nested_set, number, Event, EventKey, FieldPath, TimeRange};

use crate::config::RateConfig;
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::{ProcessorError, Result};
use crate::stage::Processor;

/// A processor that emits the rate of change between event pairs.
pub struct Rate {
    name: String,
    field_spec: Vec<FieldPath>,
    allow_negative: bool,
    diagnostics: Diagnostics,
    previous: Option<Event>,
    warned_paths: Vec<FieldPath>,
}

impl Rate {
    pub fn new(config: RateConfig, diagnostics: Diagnostics) -> Self {
        Rate {
            name: "rate".to_string(),
            field_spec: config.field_spec.paths().to_vec(),
            allow_negative: config.allow_negative,
            diagnostics,
            previous: None,
            warned_paths: Vec::new(),
        }
    }

    fn warn_non_numeric(&mut self, path: &FieldPath) {
        if !self.warned_paths.contains(path) {
            self.warned_paths.push(path.clone());
            self.diagnostics.warn(
                &self.name,
                WarningKind::NonNumeric,
                format!("{path} contains non-numeric values or does not exist - rate will be null"),
            );
        }
    }

    fn rate_event(&mut self, previous: &Event, current: &Event) -> Result<Event> {
        let prev_ms = previous.timestamp_ms();
        let curr_ms = current.timestamp_ms();
        let delta_seconds = (curr_ms - prev_ms) as f64 / 1_000.0;

        let mut data = Map::new();
        for path in &self.field_spec.clone() {
            let rate_path = path.with_leaf_suffix("_rate");

            let prev_value = previous.get(path).and_then(as_number);
            let curr_value = current.get(path).and_then(as_number);

            let rate = match (prev_value, curr_value) {
                (Some(p), Some(c)) if delta_seconds > 0.0 => {
                    let rate = (c - p) / delta_seconds;
                    if !self.allow_negative && rate < 0.0 {
                        // counter reset: a negative differential is noise
                        Value::Null
                    } else {
                        number(rate)
                    }
                }
                _ => {
                    self.warn_non_numeric(path);
                    Value::Null
                }
            };
            nested_set(&mut data, &rate_path, rate);
        }

        Ok(Event::ranged(
            TimeRange::new(prev_ms, curr_ms)?,
            Value::Object(data),
        ))
    }
}

impl Processor for Rate {
    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        if !matches!(event.key(), EventKey::Instant(_)) {
            return Err(ProcessorError::Config(
                "rate requires instant-keyed events".to_string(),
            ));
        }

        let previous = match self.previous.take() {
            None => {
                // takes two to tango
                self.previous = Some(event);
                return Ok(Vec::new());
            }
            Some(previous) => previous,
        };

        let out = self.rate_event(&previous, &event)?;
        self.previous = Some(event);
        Ok(vec![out])
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(rate: &mut Rate, events: Vec<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        for event in events {
            out.extend(rate.process(event).unwrap());
        }
        out
    }

    fn counter_events() -> Vec<Event> {
        [
            (0, 1),
            (30_000, 3),
            (60_000, 10),
            (90_000, 40),
            (120_000, 70),
            (150_000, 130),
            (180_000, 190),
            (210_000, 220),
            (240_000, 300),
            (270_000, 390),
            (300_000, 510),
        ]
        .iter()
        .map(|&(t, v)| Event::at_ms(t, json!({ "in": v })))
        .collect()
    }

    #[test]
    fn test_rate_magnitude() {
        let config = RateConfig::new().with_field_spec("in");
        let mut rate = Rate::new(config, Diagnostics::new());
        let out = run(&mut rate, counter_events());

        // one less than the source
        assert_eq!(out.len(), 10);
        assert_eq!(out[2].get("in_rate"), Some(&json!(1.0)));
        assert_eq!(out[3].get("in_rate"), Some(&json!(1.0)));
        assert_eq!(out[4].get("in_rate"), Some(&json!(2.0)));
        assert_eq!(out[8].get("in_rate"), Some(&json!(3.0)));
        assert_eq!(out[9].get("in_rate"), Some(&json!(4.0)));
    }

    #[test]
    fn test_output_is_range_keyed() {
        let config = RateConfig::new().with_field_spec("in");
        let mut rate = Rate::new(config, Diagnostics::new());
        let out = run(&mut rate, counter_events());
        assert_eq!(
            out[0].key(),
            &EventKey::Range(TimeRange::new(0, 30_000).unwrap())
        );
    }

    #[test]
    fn test_negative_rate_policy() {
        let events = vec![
            Event::at_ms(0, json!({"value": 100})),
            Event::at_ms(10_000, json!({"value": 50})),
        ];

        let mut allowed = Rate::new(RateConfig::new(), Diagnostics::new());
        let out = run(&mut allowed, events.clone());
        assert_eq!(out[0].get("value_rate"), Some(&json!(-5.0)));

        let mut disallowed = Rate::new(RateConfig::new().disallow_negative(), Diagnostics::new());
        let out = run(&mut disallowed, events);
        assert_eq!(out[0].get("value_rate"), Some(&Value::Null));
    }

    #[test]
    fn test_non_numeric_warns_and_nulls() {
        let diagnostics = Diagnostics::new();
        let mut rate = Rate::new(RateConfig::new(), diagnostics.clone());
        let out = run(
            &mut rate,
            vec![
                Event::at_ms(0, json!({"value": 1})),
                Event::at_ms(1_000, json!({"value": null})),
                Event::at_ms(2_000, json!({"value": null})),
            ],
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("value_rate"), Some(&Value::Null));
        assert_eq!(out[1].get("value_rate"), Some(&Value::Null));
        // the same path only warns once
        assert_eq!(diagnostics.count_of(WarningKind::NonNumeric), 1);
    }

    #[test]
    fn test_non_instant_input_rejected() {
        let mut rate = Rate::new(RateConfig::new(), Diagnostics::new());
        let ranged = Event::ranged(TimeRange::new(0, 1_000).unwrap(), json!({"value": 1}));
        assert!(rate.process(ranged).is_err());
    }
}
