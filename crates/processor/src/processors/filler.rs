//! Fill missing and invalid values
//!
//! Replaces invalid values (missing markers, non-finite numbers, empty
//! strings) with zero, the last known-good value, or an interpolation
//! between the bounding good values. Linear fill buffers an invalid run
//! until a closing good value arrives, so it requires full visibility into
//! the stream; the pipeline builder rejects it outside a bounded,
//! flush-only pipeline.

use serde_json::{json, Value};

use timeflux_types::{leaf_paths, nested_get, nested_set, as_number, is_valid, number, Event, FieldPath};

use crate::config::{FillConfig, FillMethod};
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::Result;
use crate::stage::Processor;

/// Consecutive-fill counters, one slot per field path.
///
/// Paths are resolved to slots on first sight rather than hashed on every
/// event; the set of paths per stream is small and stable.
#[derive(Debug, Default)]
struct PathCounters(Vec<(FieldPath, usize)>);

impl PathCounters {
    fn get(&self, path: &FieldPath) -> usize {
        self.0
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    fn increment(&mut self, path: &FieldPath) {
        match self.0.iter_mut().find(|(p, _)| p == path) {
            Some((_, n)) => *n += 1,
            None => self.0.push((path.clone(), 1)),
        }
    }

    fn reset(&mut self, path: &FieldPath) {
        if let Some((_, n)) = self.0.iter_mut().find(|(p, _)| p == path) {
            *n = 0;
        }
    }
}

/// A processor that fills missing/invalid values with new values.
pub struct Filler {
    name: String,
    method: FillMethod,
    field_spec: Option<Vec<FieldPath>>,
    fill_limit: Option<usize>,
    diagnostics: Diagnostics,

    // pad/zero state
    previous: Option<Event>,
    counters: PathCounters,

    // linear state: the last composite-good event and the invalid run
    // buffered since it
    last_good: Option<Event>,
    cache: Vec<Event>,

    // list-valued paths get positional fills and are excluded from
    // interpolation
    filled_lists: Vec<FieldPath>,

    warned_paths: Vec<FieldPath>,
}

impl Filler {
    pub fn new(config: FillConfig, diagnostics: Diagnostics) -> Self {
        Filler {
            name: "fill".to_string(),
            method: config.method,
            field_spec: config.field_spec.map(|s| s.paths().to_vec()),
            fill_limit: config.fill_limit,
            diagnostics,
            previous: None,
            counters: PathCounters::default(),
            last_good: None,
            cache: Vec::new(),
            filled_lists: Vec::new(),
            warned_paths: Vec::new(),
        }
    }

    fn warn_bad_path(&mut self, path: &FieldPath) {
        if !self.warned_paths.contains(path) {
            self.warned_paths.push(path.clone());
            self.diagnostics.warn(
                &self.name,
                WarningKind::BadPath,
                format!("path does not exist: {path}"),
            );
        }
    }

    /// Positional fill inside a list value. Each element is repaired from
    /// its neighbors within the same list, independently of event history.
    fn fill_list(&self, list: &mut [Value]) {
        match self.method {
            FillMethod::Zero => {
                for value in list.iter_mut() {
                    if !is_valid(value) {
                        *value = json!(0);
                    }
                }
            }
            FillMethod::Pad => {
                for i in 1..list.len() {
                    if !is_valid(&list[i]) && is_valid(&list[i - 1]) {
                        list[i] = list[i - 1].clone();
                    }
                }
            }
            FillMethod::Linear => {
                for i in 0..list.len() {
                    if is_valid(&list[i]) && as_number(&list[i]).is_none() {
                        self.diagnostics.warn(
                            &self.name,
                            WarningKind::NonNumeric,
                            "linear requires numeric values - skipping this list",
                        );
                        break;
                    }
                    if !is_valid(&list[i]) {
                        let previous = if i > 0 { as_number(&list[i - 1]) } else { None };
                        let next = list[i + 1..].iter().find(|v| is_valid(v)).and_then(as_number);
                        if let (Some(p), Some(n)) = (previous, next) {
                            list[i] = number((p + n) / 2.0);
                        }
                        if next.is_none() {
                            // no more good values forward, nothing left to do
                            break;
                        }
                    }
                }
            }
        }
    }

    fn fill_lists_in_event(&mut self, event: Event) -> Event {
        if self.filled_lists.is_empty() {
            return event;
        }
        let mut data = event.data().clone();
        let lists = self.filled_lists.clone();
        for path in &lists {
            if let Some(Value::Array(list)) = nested_get(&data, path).cloned() {
                let mut list = list;
                self.fill_list(&mut list);
                nested_set(&mut data, path, Value::Array(list));
            }
        }
        event.with_data(data)
    }

    fn pad_and_zero(&mut self, event: Event, paths: &[FieldPath]) -> Result<Vec<Event>> {
        let mut data = event.data().clone();

        for path in paths {
            let value = match nested_get(&data, path).cloned() {
                None => {
                    self.warn_bad_path(path);
                    continue;
                }
                Some(value) => value,
            };

            if let Value::Array(mut list) = value {
                self.fill_list(&mut list);
                nested_set(&mut data, path, Value::Array(list));
                continue;
            }

            if is_valid(&value) {
                self.counters.reset(path);
                continue;
            }

            // over the limit: pass through unfilled until a good value
            // resets the run
            if self
                .fill_limit
                .map_or(false, |limit| self.counters.get(path) >= limit)
            {
                continue;
            }

            match self.method {
                FillMethod::Zero => {
                    nested_set(&mut data, path, json!(0));
                    self.counters.increment(path);
                }
                FillMethod::Pad => {
                    if let Some(previous) = &self.previous {
                        if let Some(prev_value) = previous.get(path) {
                            if is_valid(prev_value) {
                                let prev_value = prev_value.clone();
                                nested_set(&mut data, path, prev_value);
                                self.counters.increment(path);
                            }
                        }
                    }
                }
                FillMethod::Linear => unreachable!("linear fill takes the buffered path"),
            }
        }

        let emit = event.with_data(data);
        self.previous = Some(emit.clone());
        Ok(vec![emit])
    }

    /// Composite validity: the event is good for interpolation bookkeeping
    /// only if every tracked path holds a valid value. List values are
    /// noted for positional filling and never gate validity.
    fn is_valid_linear_event(&mut self, event: &Event, paths: &[FieldPath]) -> bool {
        let mut valid = true;
        for path in paths {
            match event.get(path) {
                None => self.warn_bad_path(path),
                Some(Value::Array(_)) => {
                    if !self.filled_lists.contains(path) {
                        self.filled_lists.push(path.clone());
                    }
                }
                Some(value) => {
                    if !is_valid(value) {
                        valid = false;
                    }
                }
            }
        }
        valid
    }

    fn linear_fill(&mut self, event: Event, paths: &[FieldPath]) -> Result<Vec<Event>> {
        let valid = self.is_valid_linear_event(&event, paths);
        let event = self.fill_lists_in_event(event);

        if valid {
            if self.cache.is_empty() {
                self.last_good = Some(event.clone());
                return Ok(vec![event]);
            }
            if let Some(last_good) = self.last_good.take() {
                let mut chain = Vec::with_capacity(self.cache.len() + 2);
                chain.push(last_good);
                chain.append(&mut self.cache);
                chain.push(event.clone());

                let interpolated = self.interpolate_event_list(chain, paths);
                self.last_good = Some(event);
                // the head of the chain was already emitted on an earlier
                // call
                return Ok(interpolated.into_iter().skip(1).collect());
            }
            self.last_good = Some(event.clone());
            return Ok(vec![event]);
        }

        if self.last_good.is_none() {
            // no good value to fill from yet, emit as-is
            return Ok(vec![event]);
        }

        self.cache.push(event);
        if let Some(limit) = self.fill_limit {
            if self.cache.len() >= limit {
                // run too long to close within the limit: abandon it whole
                self.last_good = None;
                return Ok(std::mem::take(&mut self.cache));
            }
        }
        Ok(Vec::new())
    }

    /// Rewrite a closed run. Works one path at a time: each invalid value
    /// becomes the mean of the previous (possibly just-filled) value and
    /// the next valid raw value.
    fn interpolate_event_list(&mut self, events: Vec<Event>, paths: &[FieldPath]) -> Vec<Event> {
        let mut base = events;

        for path in paths {
            if self.filled_lists.contains(path) {
                continue;
            }

            let last = base.len() - 1;
            let mut new_events: Vec<Event> = Vec::with_capacity(base.len());
            let mut seek_forward = true;
            let mut skip_path = false;

            for (i, event) in base.iter().enumerate() {
                // the bounding events are known good, keep them as-is
                if i == 0 || i == last || skip_path {
                    new_events.push(event.clone());
                    continue;
                }

                let value = event.get(path);
                let value_is_valid = value.map(is_valid).unwrap_or(false);

                if value_is_valid && value.and_then(as_number).is_none() {
                    self.diagnostics.warn(
                        &self.name,
                        WarningKind::NonNumeric,
                        format!("linear requires numeric values - skipping {path} for this run"),
                    );
                    skip_path = true;
                    new_events.push(event.clone());
                    continue;
                }

                if value_is_valid {
                    new_events.push(event.clone());
                    continue;
                }

                // previously interpolated values live in new_events
                let previous = new_events[i - 1].get(path).and_then(as_number);

                let mut next = None;
                if seek_forward {
                    for candidate in &base[i + 1..] {
                        let v = candidate.get(path);
                        if v.map(is_valid).unwrap_or(false) {
                            next = v.and_then(as_number);
                            break;
                        }
                    }
                }

                match (previous, next) {
                    (Some(p), Some(n)) => {
                        new_events.push(event.set_value(path, number((p + n) / 2.0)));
                    }
                    _ => {
                        new_events.push(event.clone());
                        if next.is_none() {
                            // no more good values forward for this path
                            seek_forward = false;
                        }
                    }
                }
            }

            base = new_events;
        }

        base
    }
}

impl Processor for Filler {
    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        let paths = match &self.field_spec {
            Some(paths) => paths.clone(),
            None => leaf_paths(event.data()),
        };

        match self.method {
            FillMethod::Zero | FillMethod::Pad => self.pad_and_zero(event, &paths),
            FillMethod::Linear => self.linear_fill(event, &paths),
        }
    }

    fn flush(&mut self) -> Result<Vec<Event>> {
        // a run that never closed is emitted unfilled
        if self.method == FillMethod::Linear {
            self.last_good = None;
            return Ok(std::mem::take(&mut self.cache));
        }
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
