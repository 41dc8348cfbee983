//! Field addressing
//!
//! A [`FieldPath`] names exactly one (possibly nested) column; a
//! [`FieldSpec`] names one or more full column paths. The two are distinct
//! types so a list of path segments can never be passed where a list of
//! full paths is expected.

use std::fmt;

use serde::de::{Deserializer, Error as DeError, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Address of exactly one (possibly nested) column.
///
/// Constructed from a bare name (`"value"`), a dot-delimited path
/// (`"direction.in"`) or an explicit segment list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Build a path from explicit segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldPath(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a dot-delimited path.
    pub fn parse(path: &str) -> Self {
        FieldPath(path.split('.').map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The last segment of the path.
    pub fn leaf(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }

    /// The dot-joined form.
    pub fn join(&self) -> String {
        self.0.join(".")
    }

    /// A copy of this path with a suffix appended to the leaf segment.
    pub fn with_leaf_suffix(&self, suffix: &str) -> FieldPath {
        let mut segments = self.0.clone();
        if let Some(last) = segments.last_mut() {
            last.push_str(suffix);
        }
        FieldPath(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join())
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::parse(path)
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        FieldPath::parse(&path)
    }
}

impl From<&FieldPath> for FieldPath {
    fn from(path: &FieldPath) -> Self {
        path.clone()
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.join())
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let path = String::deserialize(deserializer)?;
        Ok(FieldPath::parse(&path))
    }
}

/// Address of one or more full column paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec(Vec<FieldPath>);

impl FieldSpec {
    pub fn one(path: impl Into<FieldPath>) -> Self {
        FieldSpec(vec![path.into()])
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldPath>,
    {
        FieldSpec(paths.into_iter().map(Into::into).collect())
    }

    pub fn paths(&self) -> &[FieldPath] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldPath> {
        self.0.iter()
    }
}

impl From<&str> for FieldSpec {
    fn from(path: &str) -> Self {
        FieldSpec::one(path)
    }
}

impl From<FieldPath> for FieldSpec {
    fn from(path: FieldPath) -> Self {
        FieldSpec(vec![path])
    }
}

impl From<Vec<FieldPath>> for FieldSpec {
    fn from(paths: Vec<FieldPath>) -> Self {
        FieldSpec(paths)
    }
}

impl<const N: usize> From<[&str; N]> for FieldSpec {
    fn from(paths: [&str; N]) -> Self {
        FieldSpec::from_paths(paths)
    }
}

impl Serialize for FieldSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for path in &self.0 {
            seq.serialize_element(path)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for FieldSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = FieldSpec;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a field path string or a list of field paths")
            }

            fn visit_str<E: DeError>(self, v: &str) -> Result<FieldSpec, E> {
                Ok(FieldSpec::one(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<FieldSpec, A::Error> {
                let mut paths = Vec::new();
                while let Some(path) = seq.next_element::<FieldPath>()? {
                    paths.push(path);
                }
                Ok(FieldSpec(paths))
            }
        }

        deserializer.deserialize_any(SpecVisitor)
    }
}

/// Look a path up in a nested field mapping.
///
/// Returns `None` when the path does not exist, which is distinct from a
/// present-but-null value.
pub fn nested_get<'a>(data: &'a Map<String, Value>, path: &FieldPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = data.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Set a value at a path, creating intermediate objects as needed.
pub fn nested_set(data: &mut Map<String, Value>, path: &FieldPath, value: Value) {
    let segments = path.segments();
    if segments.is_empty() {
        return;
    }

    let mut current = data;
    for segment in &segments[..segments.len() - 1] {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut().expect("just inserted an object");
    }
    current.insert(segments[segments.len() - 1].clone(), value);
}

/// Every leaf path of a nested field mapping, in key order.
///
/// Lists count as leaves; only nested objects are descended into.
pub fn leaf_paths(data: &Map<String, Value>) -> Vec<FieldPath> {
    fn recurse(value: &Value, prefix: &mut Vec<String>, out: &mut Vec<FieldPath>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    prefix.push(key.clone());
                    recurse(child, prefix, out);
                    prefix.pop();
                }
            }
            _ => out.push(FieldPath::from_segments(prefix.iter().cloned())),
        }
    }

    let mut out = Vec::new();
    let mut prefix = Vec::new();
    for (key, child) in data {
        prefix.push(key.clone());
        recurse(child, &mut prefix, &mut out);
        prefix.pop();
    }
    out
}
