//! Windowed aggregation
//!
//! Buckets incoming events by the configured window (and optional group),
//! reducing each bucket's raw values into aggregate events. Windowed
//! buckets emit index-keyed events; the global window emits one
//! range-keyed event spanning the bucket's extents.

use serde_json::{Map, Value};

use timeflux_types::{Event, FieldPath, Index, TimeMode};

use crate::collector::{Capsule, Collector};
use crate::config::{AggregateSpec, EmitOn};
use crate::error::{ProcessorError, Result};
use crate::stage::Processor;
use crate::window::{WindowSpec, GLOBAL_WINDOW_KEY};

/// A processor that reduces windowed buckets into aggregate events.
pub struct Aggregator {
    name: String,
    specs: Vec<AggregateSpec>,
    mode: TimeMode,
    collector: Collector,
}

impl Aggregator {
    pub fn new(
        specs: Vec<AggregateSpec>,
        window: WindowSpec,
        mode: TimeMode,
        emit_on: EmitOn,
        group_by: Option<FieldPath>,
    ) -> Result<Self> {
        if specs.is_empty() {
            return Err(ProcessorError::Config(
                "aggregate needs at least one field mapping".to_string(),
            ));
        }
        Ok(Aggregator {
            name: "aggregate".to_string(),
            specs,
            mode,
            collector: Collector::new(window, mode, emit_on, group_by),
        })
    }

    fn aggregate_capsule(&self, capsule: &Capsule) -> Result<Event> {
        let mut data = Map::new();
        for spec in &self.specs {
            let values = capsule.collection.values(&spec.source);
            data.insert(spec.output.clone(), spec.reducer.apply(&values));
        }

        if capsule.window_key == GLOBAL_WINDOW_KEY {
            let range = capsule.collection.range()?;
            Ok(Event::ranged(range, Value::Object(data)))
        } else {
            let index = Index::with_mode(&capsule.window_key, self.mode)?;
            Ok(Event::indexed(index, Value::Object(data)))
        }
    }

    fn aggregate_all(&self, capsules: &[Capsule]) -> Result<Vec<Event>> {
        capsules.iter().map(|c| self.aggregate_capsule(c)).collect()
    }
}

impl Processor for Aggregator {
    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        let emitted = self.collector.add_event(&event)?;
        self.aggregate_all(&emitted)
    }

    fn flush(&mut self) -> Result<Vec<Event>> {
        let remaining = self.collector.flush();
        self.aggregate_all(&remaining)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
