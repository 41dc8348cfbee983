//! Events
//!
//! An event is a temporal key plus a path-addressable field mapping. Events
//! are immutable: every mutation-shaped operation returns a new event.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::{json, Map, Value};

use crate::field::{nested_get, nested_set, FieldPath, FieldSpec};
use crate::functions::Reducer;
use crate::index::Index;
use crate::range::TimeRange;
use crate::time::sanitize;
use crate::value::is_valid;

/// The temporal identity of an event: an instant, a time range, or a
/// calendar/duration bucket.
///
/// Keys order by begin timestamp, ties broken by end. Two keys are "the
/// same key" iff they are structurally identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    Instant(i64),
    Range(TimeRange),
    Idx(Index),
}

impl EventKey {
    pub fn begin_ms(&self) -> i64 {
        match self {
            EventKey::Instant(t) => *t,
            EventKey::Range(r) => r.begin_ms(),
            EventKey::Idx(i) => i.begin_ms(),
        }
    }

    pub fn end_ms(&self) -> i64 {
        match self {
            EventKey::Instant(t) => *t,
            EventKey::Range(r) => r.end_ms(),
            EventKey::Idx(i) => i.end_ms(),
        }
    }

    /// The begin timestamp; what an event "happens at" for bucketing.
    pub fn timestamp_ms(&self) -> i64 {
        self.begin_ms()
    }

    /// The wire column name for this key variant.
    pub fn column_name(&self) -> &'static str {
        match self {
            EventKey::Instant(_) => "time",
            EventKey::Range(_) => "timerange",
            EventKey::Idx(_) => "index",
        }
    }

    /// The wire form of the key itself.
    pub fn to_json(&self) -> Value {
        match self {
            EventKey::Instant(t) => json!(t),
            EventKey::Range(r) => r.to_json(),
            EventKey::Idx(i) => i.to_json(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            EventKey::Instant(_) => 0,
            EventKey::Range(_) => 1,
            EventKey::Idx(_) => 2,
        }
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.begin_ms()
            .cmp(&other.begin_ms())
            .then_with(|| self.end_ms().cmp(&other.end_ms()))
            .then_with(|| self.rank().cmp(&other.rank()))
            .then_with(|| match (self, other) {
                (EventKey::Idx(a), EventKey::Idx(b)) => a.as_string().cmp(b.as_string()),
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A key plus an ordered-path-addressable field mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    key: EventKey,
    data: Map<String, Value>,
}

/// A bare (non-object) payload is shorthand for `{"value": v}`.
fn data_from_value(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

impl Event {
    pub fn new(key: EventKey, data: Value) -> Self {
        Event {
            key,
            data: data_from_value(data),
        }
    }

    /// An instant-keyed event at a millisecond timestamp.
    pub fn at_ms(ts_ms: i64, data: Value) -> Self {
        Event::new(EventKey::Instant(ts_ms), data)
    }

    /// An instant-keyed event at a UTC datetime.
    pub fn at_utc(dt: DateTime<Utc>, data: Value) -> Self {
        Event::at_ms(dt.timestamp_millis(), data)
    }

    /// An instant-keyed event at any aware datetime.
    ///
    /// Non-UTC offsets are normalized with a warning; timezone-naive input
    /// is unrepresentable here.
    pub fn at_time(dt: &DateTime<FixedOffset>, data: Value) -> Self {
        Event::at_utc(sanitize(dt), data)
    }

    /// A range-keyed event.
    pub fn ranged(range: TimeRange, data: Value) -> Self {
        Event::new(EventKey::Range(range), data)
    }

    /// An index-keyed event.
    pub fn indexed(index: Index, data: Value) -> Self {
        Event::new(EventKey::Idx(index), data)
    }

    pub fn key(&self) -> &EventKey {
        &self.key
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.key.timestamp_ms()
    }

    pub fn begin_ms(&self) -> i64 {
        self.key.begin_ms()
    }

    pub fn end_ms(&self) -> i64 {
        self.key.end_ms()
    }

    /// Value at a field path; `None` when the path does not exist.
    pub fn get(&self, path: impl Into<FieldPath>) -> Option<&Value> {
        let path = path.into();
        nested_get(&self.data, &path)
    }

    /// Value at the default `"value"` column.
    pub fn value(&self) -> Option<&Value> {
        self.data.get("value")
    }

    pub fn is_valid_at(&self, path: &FieldPath) -> bool {
        nested_get(&self.data, path).map(is_valid).unwrap_or(false)
    }

    /// A copy of this event with a replaced field mapping.
    pub fn with_data(&self, data: Map<String, Value>) -> Event {
        Event {
            key: self.key.clone(),
            data,
        }
    }

    /// A copy of this event with a replaced key.
    pub fn with_key(&self, key: EventKey) -> Event {
        Event {
            key,
            data: self.data.clone(),
        }
    }

    /// A copy of this event with one field set.
    pub fn set_value(&self, path: &FieldPath, value: Value) -> Event {
        let mut data = self.data.clone();
        nested_set(&mut data, path, value);
        Event {
            key: self.key.clone(),
            data,
        }
    }

    /// A copy with only the selected paths; everything else is dropped.
    pub fn select(&self, spec: &FieldSpec) -> Event {
        let mut data = Map::new();
        for path in spec.iter() {
            if let Some(value) = nested_get(&self.data, path) {
                nested_set(&mut data, path, value.clone());
            }
        }
        Event {
            key: self.key.clone(),
            data,
        }
    }

    /// Reduce the values at the selected paths into a single derived field.
    ///
    /// With `append` the derived field is added next to the existing data,
    /// otherwise it replaces it.
    pub fn collapse(&self, spec: &FieldSpec, name: &str, reducer: Reducer, append: bool) -> Event {
        let values: Vec<Value> = spec
            .iter()
            .map(|p| nested_get(&self.data, p).cloned().unwrap_or(Value::Null))
            .collect();
        let collapsed = reducer.apply(&values);

        let mut data = if append { self.data.clone() } else { Map::new() };
        nested_set(&mut data, &FieldPath::parse(name), collapsed);
        Event {
            key: self.key.clone(),
            data,
        }
    }

    /// A copy with top-level columns renamed per the given pairs.
    pub fn rename(&self, renames: &[(&str, &str)]) -> Event {
        let mut data = Map::new();
        for (key, value) in &self.data {
            let name = renames
                .iter()
                .find(|(old, _)| old == key)
                .map(|(_, new)| new.to_string())
                .unwrap_or_else(|| key.clone());
            data.insert(name, value.clone());
        }
        Event {
            key: self.key.clone(),
            data,
        }
    }

    /// The flat wire row: key first, then the values in column order.
    pub fn to_point(&self, columns: &[String]) -> Vec<Value> {
        let mut point = vec![self.key.to_json()];
        for column in columns {
            point.push(self.data.get(column).cloned().unwrap_or(Value::Null));
        }
        point
    }

    /// The standalone wire form, e.g. `{"time": t, "data": {...}}`.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(self.key.column_name().to_string(), self.key.to_json());
        obj.insert("data".to_string(), Value::Object(self.data.clone()));
        Value::Object(obj)
    }

    /// Merge same-key events into one event per distinct key, unioning
    /// their fields (later events win on conflicts). Returns the groups in
    /// first-appearance order.
    pub fn merge(events: &[Event]) -> Vec<Event> {
        let mut groups: Vec<(EventKey, Map<String, Value>)> = Vec::new();
        for event in events {
            match groups.iter_mut().find(|(key, _)| key == event.key()) {
                Some((_, data)) => {
                    for (k, v) in event.data() {
                        data.insert(k.clone(), v.clone());
                    }
                }
                None => groups.push((event.key().clone(), event.data().clone())),
            }
        }
        groups
            .into_iter()
            .map(|(key, data)| Event {
                key,
                data,
            })
            .collect()
    }

    /// Combine same-key events by reducing each selected field across the
    /// group. Returns one event per distinct key, in first-appearance order.
    pub fn combine(events: &[Event], spec: &FieldSpec, reducer: Reducer) -> Vec<Event> {
        let mut keys: Vec<EventKey> = Vec::new();
        for event in events {
            if !keys.contains(event.key()) {
                keys.push(event.key().clone());
            }
        }

        keys.into_iter()
            .map(|key| {
                let mut data = Map::new();
                for path in spec.iter() {
                    let values: Vec<Value> = events
                        .iter()
                        .filter(|e| *e.key() == key)
                        .map(|e| nested_get(e.data(), path).cloned().unwrap_or(Value::Null))
                        .collect();
                    nested_set(&mut data, path, reducer.apply(&values));
                }
                Event { key, data }
            })
            .collect()
    }

    /// Combine with the sum reducer.
    pub fn sum(events: &[Event], spec: &FieldSpec) -> Vec<Event> {
        Event::combine(events, spec, Reducer::Sum)
    }

    /// Combine with the average reducer.
    pub fn avg(events: &[Event], spec: &FieldSpec) -> Vec<Event> {
        Event::combine(events, spec, Reducer::Avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;

    #[test]
    fn test_key_ordering() {
        let a = EventKey::Instant(100);
        let b = EventKey::Instant(200);
        let c = EventKey::Range(TimeRange::new(100, 300).unwrap());

        assert!(a < b);
        assert!(a < c); // same begin, instant has the smaller end
        assert_eq!(a, EventKey::Instant(100));
        assert_ne!(a, c);
    }

    #[test]
    fn test_scalar_payload_shorthand() {
        let event = Event::at_ms(1000, json!(42));
        assert_eq!(event.value(), Some(&json!(42)));
    }

    #[test]
    fn test_immutability_of_set_value() {
        let event = Event::at_ms(1000, json!({"in": 1}));
        let updated = event.set_value(&"in".into(), json!(2));
        assert_eq!(event.get("in"), Some(&json!(1)));
        assert_eq!(updated.get("in"), Some(&json!(2)));
    }

    #[test]
    fn test_select_and_collapse() {
        let event = Event::at_ms(1000, json!({"in": 1, "out": 4, "status": "ok"}));

        let selected = event.select(&FieldSpec::from(["in", "out"]));
        assert_eq!(selected.data().len(), 2);
        assert_eq!(selected.get("status"), None);

        let collapsed = event.collapse(&FieldSpec::from(["in", "out"]), "total", Reducer::Sum, true);
        assert_eq!(collapsed.get("total"), Some(&json!(5.0)));
        assert_eq!(collapsed.get("status"), Some(&json!("ok")));

        let replaced =
            event.collapse(&FieldSpec::from(["in", "out"]), "total", Reducer::Sum, false);
        assert_eq!(replaced.data().len(), 1);
    }

    #[test]
    fn test_rename() {
        let event = Event::at_ms(1000, json!({"in": 1, "out": 2}));
        let renamed = event.rename(&[("in", "new_in")]);
        assert_eq!(renamed.get("new_in"), Some(&json!(1)));
        assert_eq!(renamed.get("out"), Some(&json!(2)));
        assert_eq!(renamed.get("in"), None);
    }

    #[test]
    fn test_to_point_and_json() {
        let event = Event::at_ms(1_400_425_947_000, json!({"value": 52, "status": "ok"}));
        let point = event.to_point(&["value".to_string(), "status".to_string()]);
        assert_eq!(point, vec![json!(1_400_425_947_000i64), json!(52), json!("ok")]);

        let range = TimeRange::new(0, 1000).unwrap();
        let ranged = Event::ranged(range, json!({"title": "BOOM"}));
        assert_eq!(
            ranged.to_json(),
            json!({"timerange": [0, 1000], "data": {"title": "BOOM"}})
        );
    }

    #[test]
    fn test_merge_groups_by_key() {
        let events = vec![
            Event::at_ms(1000, json!({"in": 1})),
            Event::at_ms(1000, json!({"out": 2})),
            Event::at_ms(2000, json!({"in": 3})),
        ];
        let merged = Event::merge(&events);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].get("in"), Some(&json!(1)));
        assert_eq!(merged[0].get("out"), Some(&json!(2)));
        assert_eq!(merged[1].get("in"), Some(&json!(3)));
    }

    #[test]
    fn test_combine_produces_grouped_results() {
        let events = vec![
            Event::at_ms(1000, json!({"in": 1})),
            Event::at_ms(1000, json!({"in": 2})),
            Event::at_ms(2000, json!({"in": 5})),
        ];
        let summed = Event::sum(&events, &FieldSpec::one("in"));
        assert_eq!(summed.len(), 2);
        assert_eq!(summed[0].get("in"), Some(&json!(3.0)));
        assert_eq!(summed[1].get("in"), Some(&json!(5.0)));

        let averaged = Event::avg(&events, &FieldSpec::one("in"));
        assert_eq!(averaged[0].get("in"), Some(&json!(1.5)));
    }
}
