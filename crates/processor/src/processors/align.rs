//! Align events onto regular window boundaries
//!
//! Every window boundary falling between two consecutive input events
//! produces one output event at that boundary, valued by interpolation
//! between the bounding pair or by holding the earlier event's value. Only
//! the boundary events are emitted; the raw events are consumed.

use serde_json::{Map, Value};

use timeflux_types::{as_number, nested_set, number, Event, EventKey, FieldPath};

use crate::config::{AlignConfig, AlignMethod};
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::{ProcessorError, Result};
use crate::stage::Processor;

/// A processor that aligns irregular data onto window boundaries.
pub struct Aligner {
    name: String,
    field_spec: Vec<FieldPath>,
    window_ms: i64,
    method: AlignMethod,
    limit: Option<usize>,
    diagnostics: Diagnostics,
    previous: Option<Event>,
}

impl Aligner {
    pub fn new(config: AlignConfig, diagnostics: Diagnostics) -> Result<Self> {
        let window_ms = config.validate()?;
        Ok(Aligner {
            name: "align".to_string(),
            field_spec: config.field_spec.paths().to_vec(),
            window_ms,
            method: config.method,
            limit: config.limit,
            diagnostics,
            previous: None,
        })
    }

    /// Window boundaries strictly after the previous event, up to and
    /// including the current one.
    fn boundaries(&self, prev_ms: i64, curr_ms: i64) -> Vec<i64> {
        let mut out = Vec::new();
        let mut t = (prev_ms.div_euclid(self.window_ms) + 1) * self.window_ms;
        while t <= curr_ms {
            out.push(t);
            t += self.window_ms;
        }
        out
    }

    fn boundary_event(
        &self,
        boundary_ms: i64,
        previous: &Event,
        current: &Event,
        nulled: bool,
        warned: &mut bool,
    ) -> Event {
        let prev_ms = previous.timestamp_ms();
        let curr_ms = current.timestamp_ms();

        let mut data = Map::new();
        for path in &self.field_spec {
            let value = if nulled {
                Value::Null
            } else {
                match self.method {
                    AlignMethod::Hold => previous.get(path).cloned().unwrap_or(Value::Null),
                    AlignMethod::Linear => {
                        let prev_value = previous.get(path).and_then(as_number);
                        let curr_value = current.get(path).and_then(as_number);
                        match (prev_value, curr_value) {
                            (Some(p), Some(c)) => {
                                let fraction =
                                    (boundary_ms - prev_ms) as f64 / (curr_ms - prev_ms) as f64;
                                number(p + (c - p) * fraction)
                            }
                            _ => {
                                if !*warned {
                                    *warned = true;
                                    self.diagnostics.warn(
                                        &self.name,
                                        WarningKind::NonNumeric,
                                        format!(
                                            "{path} contains non-numeric or missing values - \
                                             boundary values will be null"
                                        ),
                                    );
                                }
                                Value::Null
                            }
                        }
                    }
                }
            };
            nested_set(&mut data, path, value);
        }
        Event::at_ms(boundary_ms, Value::Object(data))
    }
}

impl Processor for Aligner {
    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        if !matches!(event.key(), EventKey::Instant(_)) {
            return Err(ProcessorError::Config(
                "align requires instant-keyed events".to_string(),
            ));
        }

        let previous = match self.previous.take() {
            None => {
                self.previous = Some(event);
                return Ok(Vec::new());
            }
            Some(previous) => previous,
        };

        let boundaries = self.boundaries(previous.timestamp_ms(), event.timestamp_ms());

        // a gap wider than the limit is unreliable: every boundary in it
        // carries the missing marker
        let nulled = self
            .limit
            .map_or(false, |limit| boundaries.len() > limit);

        let mut warned = false;
        let out = boundaries
            .iter()
            .map(|&t| self.boundary_event(t, &previous, &event, nulled, &mut warned))
            .collect();

        self.previous = Some(event);
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use timeflux_types::TimeRange;

    fn gap_events() -> Vec<Event> {
        // Mon, 22 Aug 2016 00:00:30 GMT onward
        vec![
            Event::at_ms(1_471_824_030_000, json!({"value": 0.75})),
            Event::at_ms(1_471_824_105_000, json!({"value": 2})),
            Event::at_ms(1_471_824_210_000, json!({"value": 1})),
            Event::at_ms(1_471_824_390_000, json!({"value": 1})),
            Event::at_ms(1_471_824_510_000, json!({"value": 3})),
            Event::at_ms(1_471_824_525_000, json!({"value": 5})),
        ]
    }

    fn run(aligner: &mut Aligner, events: Vec<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        for event in events {
            out.extend(aligner.process(event).unwrap());
        }
        out
    }

    fn values(events: &[Event]) -> Vec<Value> {
        events
            .iter()
            .map(|e| e.get("value").cloned().unwrap_or(Value::Null))
            .collect()
    }

    fn assert_close(value: &Value, expected: f64) {
        let got = as_number(value).unwrap();
        assert!((got - expected).abs() < 1e-12, "got {got}, expected {expected}");
    }

    #[test]
    fn test_basic_linear_align() {
        let mut aligner = Aligner::new(AlignConfig::new("1m"), Diagnostics::new()).unwrap();
        let out = run(&mut aligner, gap_events());
        let vals = values(&out);

        assert_eq!(out.len(), 8);
        assert_close(&vals[0], 1.25);
        assert_close(&vals[1], 1.857_142_857_142_857_2);
        assert_close(&vals[2], 1.285_714_285_714_285_6);
        assert_close(&vals[3], 1.0);
        assert_close(&vals[4], 1.0);
        assert_close(&vals[5], 1.0);
        assert_close(&vals[6], 1.5);
        assert_close(&vals[7], 2.5);
    }

    #[test]
    fn test_basic_hold_align() {
        let config = AlignConfig::new("1m").with_method(AlignMethod::Hold);
        let mut aligner = Aligner::new(config, Diagnostics::new()).unwrap();
        let out = run(&mut aligner, gap_events());
        let vals = values(&out);

        assert_eq!(out.len(), 8);
        assert_close(&vals[0], 0.75);
        assert_close(&vals[1], 2.0);
        assert_close(&vals[2], 2.0);
        assert_close(&vals[3], 1.0);
        assert_close(&vals[7], 1.0);
    }

    #[test]
    fn test_limit_nulls_the_whole_gap() {
        let config = AlignConfig::new("1m")
            .with_method(AlignMethod::Hold)
            .with_limit(2);
        let mut aligner = Aligner::new(config, Diagnostics::new()).unwrap();
        let out = run(&mut aligner, gap_events());
        let vals = values(&out);

        assert_eq!(out.len(), 8);
        assert_close(&vals[2], 2.0);
        assert_eq!(vals[3], Value::Null);
        assert_eq!(vals[4], Value::Null);
        assert_eq!(vals[5], Value::Null);
        assert_close(&vals[6], 1.0);
    }

    #[test]
    fn test_non_numeric_gap_warns_once() {
        let diagnostics = Diagnostics::new();
        let mut aligner = Aligner::new(AlignConfig::new("1m"), diagnostics.clone()).unwrap();

        let mut events = gap_events();
        events[4] = Event::at_ms(1_471_824_510_000, json!({"value": "non_numeric"}));
        let out = run(&mut aligner, events);
        let vals = values(&out);

        assert_eq!(out.len(), 8);
        assert_eq!(vals[6], Value::Null);
        assert_eq!(vals[7], Value::Null);
        assert_eq!(diagnostics.count_of(WarningKind::NonNumeric), 1);
    }

    #[test]
    fn test_boundary_on_event_timestamp() {
        let mut aligner = Aligner::new(AlignConfig::new("30s"), Diagnostics::new()).unwrap();
        let out = run(
            &mut aligner,
            vec![
                Event::at_ms(89_000, json!({"value": 100})),
                Event::at_ms(181_000, json!({"value": 200})),
            ],
        );
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].timestamp_ms(), 90_000);
        assert_eq!(out[3].timestamp_ms(), 180_000);
    }

    #[test]
    fn test_non_instant_input_rejected() {
        let mut aligner = Aligner::new(AlignConfig::new("1m"), Diagnostics::new()).unwrap();
        let ranged = Event::ranged(TimeRange::new(0, 1_000).unwrap(), json!({"value": 1}));
        assert!(aligner.process(ranged).is_err());
    }
}
