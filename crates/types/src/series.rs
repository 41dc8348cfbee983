//! TimeSeries
//!
//! A named collection plus metadata; the serialization boundary to the JSON
//! wire format:
//!
//! ```json
//! {
//!   "name": "traffic",
//!   "columns": ["time", "value", ...],
//!   "points": [
//!     [1400425947000, 52, ...],
//!     [1400425948000, 18, ...]
//!   ]
//! }
//! ```
//!
//! The first column names the key variant (`"time"`, `"timerange"` or
//! `"index"`); unknown top-level keys round-trip through the metadata map.

use std::fmt;

use serde_json::{Map, Value};

use crate::collection::{Collection, DedupPolicy};
use crate::errors::{Result, SeriesError};
use crate::event::{Event, EventKey};
use crate::field::{FieldPath, FieldSpec};
use crate::functions::Reducer;
use crate::index::Index;
use crate::range::TimeRange;
use crate::time::TimeMode;

/// A named, ordered sequence of events with derived time bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    utc: bool,
    index: Option<Index>,
    meta: Map<String, Value>,
    columns: Vec<String>,
    collection: Collection,
}

impl TimeSeries {
    /// Build a series around an existing collection. Columns are derived
    /// from the events' top-level fields in first-appearance order.
    pub fn new(name: impl Into<String>, collection: Collection) -> Self {
        let columns = derive_columns(&collection);
        TimeSeries {
            name: name.into(),
            utc: true,
            index: None,
            meta: Map::new(),
            columns,
            collection,
        }
    }

    /// Build a series from a list of events.
    pub fn from_events(name: impl Into<String>, events: Vec<Event>) -> Result<Self> {
        Ok(TimeSeries::new(name, Collection::new(events)?))
    }

    /// Parse the wire format, reading calendar indexes in UTC.
    pub fn from_wire(wire: &Value) -> Result<Self> {
        TimeSeries::from_wire_with_mode(wire, TimeMode::Utc)
    }

    /// Parse the wire format. When the input carries `"utc": false`, its
    /// index strings are interpreted per `mode`.
    pub fn from_wire_with_mode(wire: &Value, mode: TimeMode) -> Result<Self> {
        let obj = wire
            .as_object()
            .ok_or_else(|| SeriesError::Wire("expected a JSON object".to_string()))?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SeriesError::Wire("missing name".to_string()))?
            .to_string();

        let utc = obj.get("utc").and_then(Value::as_bool).unwrap_or(true);
        let effective_mode = if utc { TimeMode::Utc } else { mode };

        let index = match obj.get("index") {
            None => None,
            Some(Value::String(s)) => Some(Index::with_mode(s, effective_mode)?),
            Some(_) => return Err(SeriesError::Wire("index must be a string".to_string())),
        };

        let columns: Vec<String> = obj
            .get("columns")
            .and_then(Value::as_array)
            .ok_or_else(|| SeriesError::Wire("missing columns".to_string()))?
            .iter()
            .map(|c| {
                c.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| SeriesError::Wire("columns must be strings".to_string()))
            })
            .collect::<Result<_>>()?;

        let (key_column, data_columns) = columns
            .split_first()
            .ok_or_else(|| SeriesError::Wire("columns must not be empty".to_string()))?;

        let points = obj
            .get("points")
            .and_then(Value::as_array)
            .ok_or_else(|| SeriesError::Wire("missing points".to_string()))?;

        let mut events = Vec::with_capacity(points.len());
        for point in points {
            let row = point
                .as_array()
                .ok_or_else(|| SeriesError::Wire("points must be arrays".to_string()))?;
            if row.is_empty() {
                return Err(SeriesError::Wire("empty point".to_string()));
            }

            let key = parse_key(key_column, &row[0], effective_mode)?;

            let mut data = Map::new();
            for (i, column) in data_columns.iter().enumerate() {
                data.insert(
                    column.clone(),
                    row.get(i + 1).cloned().unwrap_or(Value::Null),
                );
            }
            events.push(Event::new(key, Value::Object(data)));
        }

        let mut meta = Map::new();
        for (key, value) in obj {
            if !matches!(key.as_str(), "name" | "utc" | "index" | "columns" | "points") {
                meta.insert(key.clone(), value.clone());
            }
        }

        Ok(TimeSeries {
            name,
            utc,
            index,
            meta,
            columns: data_columns.to_vec(),
            collection: Collection::new(events)?,
        })
    }

    /// A copy of this series around a different collection, preserving
    /// name, metadata and flags. Columns are re-derived.
    pub fn with_collection(&self, collection: Collection) -> TimeSeries {
        let columns = derive_columns(&collection);
        TimeSeries {
            name: self.name.clone(),
            utc: self.utc,
            index: self.index.clone(),
            meta: self.meta.clone(),
            columns,
            collection,
        }
    }

    // accessors

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_utc(&self) -> bool {
        self.utc
    }

    pub fn index(&self) -> Option<&Index> {
        self.index.as_ref()
    }

    pub fn index_as_string(&self) -> Option<&str> {
        self.index.as_ref().map(Index::as_string)
    }

    pub fn index_as_range(&self) -> Option<TimeRange> {
        self.index.as_ref().map(Index::as_timerange)
    }

    /// The free-form metadata carried alongside the data.
    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    pub fn meta_value(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Data column names, without the leading key column.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn size(&self) -> usize {
        self.collection.size()
    }

    pub fn size_valid(&self, path: impl Into<FieldPath>) -> usize {
        self.collection.size_valid(&path.into())
    }

    pub fn at(&self, pos: usize) -> Result<&Event> {
        self.collection.at(pos)
    }

    pub fn at_time(&self, ts_ms: i64) -> Option<&Event> {
        self.collection.at_time(ts_ms)
    }

    pub fn bisect(&self, ts_ms: i64) -> Option<usize> {
        self.collection.bisect(ts_ms)
    }

    pub fn events(&self) -> std::slice::Iter<'_, Event> {
        self.collection.iter()
    }

    pub fn timerange(&self) -> Result<TimeRange> {
        self.collection.range()
    }

    pub fn begin_ms(&self) -> Result<i64> {
        Ok(self.timerange()?.begin_ms())
    }

    pub fn end_ms(&self) -> Result<i64> {
        Ok(self.timerange()?.end_ms())
    }

    // slicing and cleaning

    pub fn slice(&self, begin: usize, end: usize) -> TimeSeries {
        self.with_collection(self.collection.slice(begin, end))
    }

    pub fn clean(&self, spec: impl Into<FieldSpec>) -> TimeSeries {
        self.with_collection(self.collection.clean(&spec.into()))
    }

    pub fn dedup(&self, policy: DedupPolicy) -> TimeSeries {
        self.with_collection(self.collection.dedup(policy))
    }

    // column-shaped transforms; each returns a new series

    /// Rename top-level columns; everything else is carried through.
    pub fn rename_columns(&self, renames: &[(&str, &str)]) -> TimeSeries {
        self.with_collection(self.collection.map(|e| e.rename(renames)))
    }

    /// Collapse the selected columns of every event into a derived column.
    pub fn collapse(
        &self,
        spec: &FieldSpec,
        name: &str,
        reducer: Reducer,
        append: bool,
    ) -> TimeSeries {
        self.with_collection(
            self.collection
                .map(|e| e.collapse(spec, name, reducer, append)),
        )
    }

    /// Project the selected columns, dropping all others.
    pub fn select(&self, spec: impl Into<FieldSpec>) -> TimeSeries {
        let spec = spec.into();
        self.with_collection(self.collection.map(|e| e.select(&spec)))
    }

    // aggregations

    pub fn sum(&self, path: impl Into<FieldPath>) -> Option<f64> {
        self.collection.sum(path)
    }

    pub fn avg(&self, path: impl Into<FieldPath>) -> Option<f64> {
        self.collection.avg(path)
    }

    pub fn min(&self, path: impl Into<FieldPath>) -> Option<f64> {
        self.collection.min(path)
    }

    pub fn max(&self, path: impl Into<FieldPath>) -> Option<f64> {
        self.collection.max(path)
    }

    pub fn median(&self, path: impl Into<FieldPath>) -> Option<f64> {
        self.collection.median(path)
    }

    pub fn stdev(&self, path: impl Into<FieldPath>) -> Option<f64> {
        self.collection.stdev(path)
    }

    pub fn count(&self, path: impl Into<FieldPath>) -> usize {
        self.collection.count(path)
    }

    pub fn aggregate(&self, reducer: Reducer, path: impl Into<FieldPath>) -> Value {
        self.collection.aggregate(reducer, &path.into())
    }

    // serialization

    /// The wire form.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), Value::String(self.name.clone()));
        obj.insert("utc".to_string(), Value::Bool(self.utc));
        if let Some(index) = &self.index {
            obj.insert("index".to_string(), index.to_json());
        }
        for (key, value) in &self.meta {
            obj.insert(key.clone(), value.clone());
        }

        let key_column = self
            .collection
            .at_first()
            .map(|e| e.key().column_name())
            .unwrap_or("time");
        let mut columns = vec![Value::String(key_column.to_string())];
        columns.extend(self.columns.iter().map(|c| Value::String(c.clone())));
        obj.insert("columns".to_string(), Value::Array(columns));

        let points: Vec<Value> = self
            .collection
            .iter()
            .map(|e| Value::Array(e.to_point(&self.columns)))
            .collect();
        obj.insert("points".to_string(), Value::Array(points));

        Value::Object(obj)
    }
}

impl fmt::Display for TimeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn derive_columns(collection: &Collection) -> Vec<String> {
    let mut columns = Vec::new();
    for event in collection.iter() {
        for key in event.data().keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn parse_key(key_column: &str, raw: &Value, mode: TimeMode) -> Result<EventKey> {
    match key_column {
        "time" => {
            let ms = raw
                .as_i64()
                .or_else(|| raw.as_f64().map(|f| f.floor() as i64))
                .ok_or_else(|| SeriesError::Wire(format!("bad timestamp: {raw}")))?;
            Ok(EventKey::Instant(ms))
        }
        "timerange" => {
            let pair = raw
                .as_array()
                .filter(|a| a.len() == 2)
                .ok_or_else(|| SeriesError::Wire(format!("bad timerange: {raw}")))?;
            let begin = pair[0]
                .as_i64()
                .ok_or_else(|| SeriesError::Wire(format!("bad timerange: {raw}")))?;
            let end = pair[1]
                .as_i64()
                .ok_or_else(|| SeriesError::Wire(format!("bad timerange: {raw}")))?;
            Ok(EventKey::Range(TimeRange::new(begin, end)?))
        }
        "index" => {
            let s = raw
                .as_str()
                .ok_or_else(|| SeriesError::Wire(format!("bad index: {raw}")))?;
            Ok(EventKey::Idx(Index::with_mode(s, mode)?))
        }
        other => Err(SeriesError::Wire(format!("unknown key column: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire_data() -> Value {
        json!({
            "name": "traffic",
            "columns": ["time", "value", "status"],
            "points": [
                [1_400_425_947_000i64, 52, "ok"],
                [1_400_425_948_000i64, 18, "ok"],
                [1_400_425_949_000i64, 26, "fail"],
                [1_400_425_950_000i64, 93, "offline"]
            ]
        })
    }

    #[test]
    fn test_creation_variants() {
        let ts = TimeSeries::from_wire(&wire_data()).unwrap();
        assert_eq!(ts.size(), 4);
        assert_eq!(ts.name(), "traffic");
        assert!(ts.is_utc());

        let events = vec![
            Event::at_ms(1_429_673_400_000, json!({"in": 1, "out": 2})),
            Event::at_ms(1_429_673_460_000, json!({"in": 3, "out": 4})),
        ];
        let ts = TimeSeries::from_events("events", events).unwrap();
        assert_eq!(ts.size(), 2);
        assert_eq!(ts.columns(), ["in", "out"]);
    }

    #[test]
    fn test_bad_wire_input() {
        assert!(TimeSeries::from_wire(&json!({})).is_err());
        assert!(TimeSeries::from_wire(&json!([])).is_err());

        let bad_key_column = json!({
            "name": "outages",
            "columns": ["bogus_type", "title"],
            "points": [[[1, 2], "BOOM"]]
        });
        assert!(TimeSeries::from_wire(&bad_key_column).is_err());
    }

    #[test]
    fn test_round_trip() {
        let ts = TimeSeries::from_wire(&wire_data()).unwrap();
        let rebuilt = TimeSeries::from_wire(&ts.to_json()).unwrap();
        assert_eq!(ts, rebuilt);
        assert_eq!(ts.to_json(), rebuilt.to_json());
    }

    #[test]
    fn test_metadata_carried_through() {
        let mut wire = wire_data();
        let obj = wire.as_object_mut().unwrap();
        obj.insert("device".to_string(), json!("star-cr5"));
        obj.insert("id".to_string(), json!(169));

        let ts = TimeSeries::from_wire(&wire).unwrap();
        assert_eq!(ts.meta_value("device"), Some(&json!("star-cr5")));

        let rebuilt = TimeSeries::from_wire(&ts.to_json()).unwrap();
        assert_eq!(rebuilt.meta_value("id"), Some(&json!(169)));
    }

    #[test]
    fn test_series_level_index() {
        let mut wire = wire_data();
        wire.as_object_mut()
            .unwrap()
            .insert("index".to_string(), json!("1d-625"));

        let ts = TimeSeries::from_wire(&wire).unwrap();
        assert_eq!(ts.index_as_string(), Some("1d-625"));
        assert_eq!(
            ts.index_as_range().unwrap(),
            TimeRange::new(54_000_000_000, 54_086_400_000).unwrap()
        );
        assert_eq!(ts.to_json().get("index"), Some(&json!("1d-625")));
    }

    #[test]
    fn test_timerange_and_indexed_wire() {
        let ranged = json!({
            "name": "outages",
            "columns": ["timerange", "title", "esnet_ticket"],
            "points": [
                [[1_429_673_400_000i64, 1_429_707_600_000i64], "BOOM", "ESNET-20080101-001"],
                [[1_429_673_400_000i64, 1_429_707_600_000i64], "BAM!", "ESNET-20080101-002"]
            ]
        });
        let ts = TimeSeries::from_wire(&ranged).unwrap();
        assert_eq!(ts.size(), 2);
        let rebuilt = TimeSeries::from_wire(&ts.to_json()).unwrap();
        assert_eq!(ts, rebuilt);

        let indexed = json!({
            "name": "availability",
            "columns": ["index", "uptime"],
            "points": [
                ["2014-07", "100%"],
                ["2014-08", "88%"],
                ["2014-09", "95%"]
            ]
        });
        let ts = TimeSeries::from_wire(&indexed).unwrap();
        assert_eq!(ts.size(), 3);
        assert_eq!(ts.at(0).unwrap().get("uptime"), Some(&json!("100%")));
        let rebuilt = TimeSeries::from_wire(&ts.to_json()).unwrap();
        assert_eq!(ts, rebuilt);
    }

    #[test]
    fn test_range_accessors() {
        let ts = TimeSeries::from_wire(&wire_data()).unwrap();
        assert_eq!(ts.begin_ms().unwrap(), 1_400_425_947_000);
        assert_eq!(ts.end_ms().unwrap(), 1_400_425_950_000);

        let found = ts.at_time(1_400_425_949_030).unwrap();
        assert_eq!(found.get("status"), Some(&json!("fail")));
    }

    #[test]
    fn test_rename_preserves_values_and_keys() {
        let ts = TimeSeries::from_events(
            "collection",
            vec![
                Event::at_ms(1_429_673_400_000, json!({"in": 1, "out": 2})),
                Event::at_ms(1_429_673_460_000, json!({"in": 3, "out": 4})),
            ],
        )
        .unwrap();

        let renamed = ts.rename_columns(&[("in", "new_in"), ("out", "new_out")]);
        assert_eq!(renamed.at(0).unwrap().get("new_in"), ts.at(0).unwrap().get("in"));
        assert_eq!(renamed.at(1).unwrap().get("new_out"), ts.at(1).unwrap().get("out"));
        assert_eq!(
            renamed.at(0).unwrap().timestamp_ms(),
            ts.at(0).unwrap().timestamp_ms()
        );
        // the input series is untouched
        assert_eq!(ts.at(0).unwrap().get("in"), Some(&json!(1)));
    }

    #[test]
    fn test_select_and_collapse() {
        let ts = TimeSeries::from_events(
            "collection",
            vec![Event::at_ms(1_000, json!({"in": 1, "out": 4, "status": "ok"}))],
        )
        .unwrap();

        let selected = ts.select(["in", "out"]);
        assert_eq!(selected.columns(), ["in", "out"]);
        assert_eq!(selected.at(0).unwrap().get("status"), None);

        let collapsed = ts.collapse(&FieldSpec::from(["in", "out"]), "total", Reducer::Sum, false);
        assert_eq!(collapsed.at(0).unwrap().get("total"), Some(&json!(5.0)));
    }

    #[test]
    fn test_aggregation_delegates() {
        let ts = TimeSeries::from_events(
            "collection",
            vec![
                Event::at_ms(1_000, json!({"in": 1, "out": 2})),
                Event::at_ms(2_000, json!({"in": 3, "out": 4})),
                Event::at_ms(3_000, json!({"in": 5, "out": 6})),
            ],
        )
        .unwrap();
        assert_eq!(ts.sum("in"), Some(9.0));
        assert_eq!(ts.avg("out"), Some(4.0));
        assert_eq!(ts.median("out"), Some(4.0));
        assert_eq!(ts.count("in"), 3);
    }
}
