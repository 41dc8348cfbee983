//! Collections of events
//!
//! A collection is an ordered sequence of events. It tracks whether the
//! sequence is chronological (ascending by key); operations that need order
//! either re-sort on demand or work positionally.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, SeriesError};
use crate::event::{Event, EventKey};
use crate::field::{nested_get, FieldPath, FieldSpec};
use crate::functions::Reducer;
use crate::range::TimeRange;
use crate::value::as_number;

/// Which payload survives when duplicates collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKeep {
    First,
    Last,
    MergeFields,
}

/// Duplicate detection and resolution policy.
///
/// Duplicates share a key; with `compare_payload` they must also carry
/// equal data, so events at the same key with distinct payloads survive
/// side by side. Note that dedup compares whatever payload reaches it: a
/// preceding select or collapse stage changes duplicate-ness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupPolicy {
    pub keep: DedupKeep,
    pub compare_payload: bool,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        DedupPolicy {
            keep: DedupKeep::First,
            compare_payload: false,
        }
    }
}

impl DedupPolicy {
    pub fn keep_first() -> Self {
        DedupPolicy::default()
    }

    pub fn keep_last() -> Self {
        DedupPolicy {
            keep: DedupKeep::Last,
            compare_payload: false,
        }
    }

    pub fn merge_fields() -> Self {
        DedupPolicy {
            keep: DedupKeep::MergeFields,
            compare_payload: false,
        }
    }

    pub fn with_payload_compare(mut self) -> Self {
        self.compare_payload = true;
        self
    }
}

/// Collapse duplicate events per the policy, preserving first-appearance
/// order of the surviving groups.
pub fn dedup_events(events: &[Event], policy: DedupPolicy) -> Vec<Event> {
    let mut kept: Vec<Event> = Vec::new();
    for event in events {
        let existing = kept.iter_mut().find(|e| {
            e.key() == event.key() && (!policy.compare_payload || e.data() == event.data())
        });
        match existing {
            None => kept.push(event.clone()),
            Some(slot) => match policy.keep {
                DedupKeep::First => {}
                DedupKeep::Last => *slot = event.clone(),
                DedupKeep::MergeFields => {
                    let mut data = slot.data().clone();
                    for (k, v) in event.data() {
                        data.insert(k.clone(), v.clone());
                    }
                    *slot = slot.with_data(data);
                }
            },
        }
    }
    kept
}

/// An ordered sequence of events.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Collection {
    events: Vec<Event>,
    chronological: bool,
}

impl Collection {
    /// Build a collection from events.
    ///
    /// All events must share a key variant; mixing instants with ranges or
    /// indexes is rejected.
    pub fn new(events: Vec<Event>) -> Result<Self> {
        if let Some(first) = events.first() {
            let name = first.key().column_name();
            if events.iter().any(|e| e.key().column_name() != name) {
                return Err(SeriesError::HeterogeneousKeys);
            }
        }
        let chronological = events.windows(2).all(|w| w[0].key() <= w[1].key());
        Ok(Collection {
            events,
            chronological,
        })
    }

    pub fn empty() -> Self {
        Collection {
            events: Vec::new(),
            chronological: true,
        }
    }

    pub fn size(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Event at a position.
    pub fn at(&self, pos: usize) -> Result<&Event> {
        self.events
            .get(pos)
            .ok_or(SeriesError::OutOfBounds(pos, self.events.len()))
    }

    pub fn at_first(&self) -> Option<&Event> {
        self.events.first()
    }

    pub fn at_last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// The event at or immediately before `ts_ms`.
    pub fn at_time(&self, ts_ms: i64) -> Option<&Event> {
        self.bisect(ts_ms).and_then(|i| self.events.get(i))
    }

    /// All events sharing a key. Relevant because merge/sum/avg produce
    /// possibly-multiple grouped results rather than one global scalar.
    pub fn at_key(&self, key: &EventKey) -> Vec<&Event> {
        self.events.iter().filter(|e| e.key() == key).collect()
    }

    /// The greatest position whose timestamp is at or before `ts_ms`, or
    /// `None` when every event is later.
    pub fn bisect(&self, ts_ms: i64) -> Option<usize> {
        let mut result = None;
        for (i, event) in self.events.iter().enumerate() {
            if event.timestamp_ms() > ts_ms {
                break;
            }
            result = Some(i);
        }
        result
    }

    /// A new collection with the event appended.
    pub fn add_event(&self, event: Event) -> Result<Collection> {
        if let Some(first) = self.events.first() {
            if first.key().column_name() != event.key().column_name() {
                return Err(SeriesError::HeterogeneousKeys);
            }
        }
        let chronological = self.chronological
            && self
                .events
                .last()
                .map(|last| last.key() <= event.key())
                .unwrap_or(true);
        let mut events = self.events.clone();
        events.push(event);
        Ok(Collection {
            events,
            chronological,
        })
    }

    /// Events from `begin` up to but not including `end`.
    pub fn slice(&self, begin: usize, end: usize) -> Collection {
        let end = end.min(self.events.len());
        let begin = begin.min(end);
        Collection {
            events: self.events[begin..end].to_vec(),
            chronological: self.chronological,
        }
    }

    pub fn filter(&self, predicate: impl Fn(&Event) -> bool) -> Collection {
        Collection {
            events: self.events.iter().filter(|e| predicate(e)).cloned().collect(),
            chronological: self.chronological,
        }
    }

    pub fn map(&self, op: impl Fn(&Event) -> Event) -> Collection {
        let events: Vec<Event> = self.events.iter().map(op).collect();
        let chronological = events.windows(2).all(|w| w[0].key() <= w[1].key());
        Collection {
            events,
            chronological,
        }
    }

    /// Only the events holding valid values at every selected path.
    pub fn clean(&self, spec: &FieldSpec) -> Collection {
        self.filter(|e| spec.iter().all(|p| e.is_valid_at(p)))
    }

    /// Collapse same-key duplicates per the policy.
    pub fn dedup(&self, policy: DedupPolicy) -> Collection {
        let events = dedup_events(&self.events, policy);
        let chronological = events.windows(2).all(|w| w[0].key() <= w[1].key());
        Collection {
            events,
            chronological,
        }
    }

    pub fn is_chronological(&self) -> bool {
        self.chronological
    }

    /// A copy sorted ascending by key. Sorting is stable, so same-key
    /// events keep their arrival order.
    pub fn sort_by_key(&self) -> Collection {
        let mut events = self.events.clone();
        events.sort_by(|a, b| a.key().cmp(b.key()));
        Collection {
            events,
            chronological: true,
        }
    }

    /// The extents of the collection as a time range.
    pub fn range(&self) -> Result<TimeRange> {
        let begin = self
            .events
            .iter()
            .map(Event::begin_ms)
            .min()
            .ok_or_else(|| SeriesError::TimeRange("empty collection has no range".to_string()))?;
        let end = self
            .events
            .iter()
            .map(Event::end_ms)
            .max()
            .ok_or_else(|| SeriesError::TimeRange("empty collection has no range".to_string()))?;
        TimeRange::new(begin, end)
    }

    /// Number of events with a valid value at the path.
    pub fn size_valid(&self, path: &FieldPath) -> usize {
        self.events.iter().filter(|e| e.is_valid_at(path)).count()
    }

    fn numeric_values(&self, path: &FieldPath) -> Vec<f64> {
        self.events
            .iter()
            .filter_map(|e| e.get(path).and_then(as_number))
            .collect()
    }

    /// Raw values at the path, one per event (missing paths yield the
    /// missing marker).
    pub fn values(&self, path: &FieldPath) -> Vec<Value> {
        self.events
            .iter()
            .map(|e| nested_get(e.data(), path).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Reduce the values at a path.
    pub fn aggregate(&self, reducer: Reducer, path: &FieldPath) -> Value {
        reducer.apply(&self.values(path))
    }

    pub fn sum(&self, path: impl Into<FieldPath>) -> Option<f64> {
        Reducer::Sum.apply_numeric(&self.numeric_values(&path.into()))
    }

    pub fn avg(&self, path: impl Into<FieldPath>) -> Option<f64> {
        Reducer::Avg.apply_numeric(&self.numeric_values(&path.into()))
    }

    pub fn min(&self, path: impl Into<FieldPath>) -> Option<f64> {
        Reducer::Min.apply_numeric(&self.numeric_values(&path.into()))
    }

    pub fn max(&self, path: impl Into<FieldPath>) -> Option<f64> {
        Reducer::Max.apply_numeric(&self.numeric_values(&path.into()))
    }

    pub fn median(&self, path: impl Into<FieldPath>) -> Option<f64> {
        Reducer::Median.apply_numeric(&self.numeric_values(&path.into()))
    }

    pub fn stdev(&self, path: impl Into<FieldPath>) -> Option<f64> {
        Reducer::Stdev.apply_numeric(&self.numeric_values(&path.into()))
    }

    pub fn first(&self, path: impl Into<FieldPath>) -> Option<Value> {
        let value = Reducer::First.apply(&self.values(&path.into()));
        if value.is_null() {
            None
        } else {
            Some(value)
        }
    }

    pub fn last(&self, path: impl Into<FieldPath>) -> Option<Value> {
        let value = Reducer::Last.apply(&self.values(&path.into()));
        if value.is_null() {
            None
        } else {
            Some(value)
        }
    }

    pub fn count(&self, path: impl Into<FieldPath>) -> usize {
        self.size_valid(&path.into())
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
