//! Event collection by window and group
//!
//! A `Collector` accumulates events into per-(window, group) collections
//! and surrenders them per the configured emission policy. It backs the
//! aggregation stage and the keyed-collection sink.

use timeflux_types::{Collection, Event, FieldPath, TimeMode};

use crate::config::EmitOn;
use crate::error::Result;
use crate::window::WindowSpec;

/// One bucket: its window key, optional group key, and events so far.
#[derive(Debug, Clone)]
pub struct Capsule {
    pub window_key: String,
    pub group_key: Option<String>,
    pub collection: Collection,
}

impl Capsule {
    /// The sink key: window and group joined, `"all"` for the global
    /// ungrouped bucket.
    pub fn sink_key(&self) -> String {
        let mut parts = Vec::new();
        if self.window_key != crate::window::GLOBAL_WINDOW_KEY {
            parts.push(self.window_key.clone());
        }
        if let Some(group) = &self.group_key {
            parts.push(group.clone());
        }
        if parts.is_empty() {
            "all".to_string()
        } else {
            parts.join("--")
        }
    }
}

/// Accumulates events into windowed, grouped collections.
#[derive(Debug)]
pub struct Collector {
    window: WindowSpec,
    mode: TimeMode,
    emit_on: EmitOn,
    group_by: Option<FieldPath>,
    // insertion order matters for deterministic emission
    buckets: Vec<(String, Capsule)>,
}

impl Collector {
    pub fn new(
        window: WindowSpec,
        mode: TimeMode,
        emit_on: EmitOn,
        group_by: Option<FieldPath>,
    ) -> Self {
        Collector {
            window,
            mode,
            emit_on,
            group_by,
            buckets: Vec::new(),
        }
    }

    fn group_key(&self, event: &Event) -> Option<String> {
        let path = self.group_by.as_ref()?;
        let value = event.get(path)?;
        Some(match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Add an event to its bucket, returning the capsules to emit per the
    /// emission policy.
    pub fn add_event(&mut self, event: &Event) -> Result<Vec<Capsule>> {
        let window_key = self.window.index_string(event.timestamp_ms(), self.mode)?;
        let group_key = self.group_key(event);

        let bucket_key = match &group_key {
            Some(group) => format!("{window_key}::{group}"),
            None => window_key.clone(),
        };

        let created = !self.buckets.iter().any(|(k, _)| *k == bucket_key);
        if created {
            self.buckets.push((
                bucket_key.clone(),
                Capsule {
                    window_key: window_key.clone(),
                    group_key,
                    collection: Collection::empty(),
                },
            ));
        }

        let position = self
            .buckets
            .iter()
            .position(|(k, _)| *k == bucket_key)
            .expect("bucket exists");
        let capsule = &mut self.buckets[position].1;
        capsule.collection = capsule.collection.add_event(event.clone())?;

        match self.emit_on {
            EmitOn::EachEvent => Ok(vec![self.buckets[position].1.clone()]),
            EmitOn::Discards => {
                // when a fixed window rolls over, retire every bucket from
                // older windows
                if created && matches!(self.window, WindowSpec::Fixed { .. }) {
                    let retired: Vec<Capsule> = self
                        .buckets
                        .iter()
                        .filter(|(_, c)| c.window_key != window_key)
                        .map(|(_, c)| c.clone())
                        .collect();
                    self.buckets.retain(|(_, c)| c.window_key == window_key);
                    Ok(retired)
                } else {
                    Ok(Vec::new())
                }
            }
            EmitOn::Flush => Ok(Vec::new()),
        }
    }

    /// Surrender every bucket with unemitted state, in arrival order.
    ///
    /// Under `EachEvent` every contribution was already emitted, so there
    /// is nothing left to surrender.
    pub fn flush(&mut self) -> Vec<Capsule> {
        let buckets: Vec<Capsule> = self.buckets.drain(..).map(|(_, c)| c).collect();
        match self.emit_on {
            EmitOn::EachEvent => Vec::new(),
            EmitOn::Discards | EmitOn::Flush => buckets,
        }
    }
}
