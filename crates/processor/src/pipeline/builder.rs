//! Pipeline builder
//!
//! The builder accumulates an immutable list of stage descriptors; nothing
//! executes until the chain is compiled with [`PipelineBuilder::build`] or
//! one of the terminal collectors. Window, time-mode and group settings
//! apply to the collector-backed stages added after them, mirroring how
//! the stages would be chained by hand.

use std::collections::BTreeMap;

use timeflux_types::{Collection, DedupPolicy, Event, FieldPath, FieldSpec, Reducer, TimeMode};

use crate::collector::Collector;
use crate::config::{AggregateSpec, AlignConfig, EmitOn, FillConfig, FillMethod, RateConfig};
use crate::diagnostics::Diagnostics;
use crate::error::{ProcessorError, Result};
use crate::pipeline::executor::Pipeline;
use crate::processors::{
    Aggregator, Aligner, Collapser, Deduper, Filler, Filter, Mapper, Offset, Rate, Selector,
    Taker,
};
use crate::stage::Processor;
use crate::window::WindowSpec;

/// The pipeline source: a bounded collection or a caller-driven feed.
pub(crate) enum Source {
    Bounded(Collection),
    Unbounded,
}

/// One stage descriptor. Collector-backed stages capture the window and
/// group settings in force when they were added.
pub enum StageConfig {
    Fill(FillConfig),
    Align(AlignConfig),
    Rate(RateConfig),
    Aggregate {
        specs: Vec<AggregateSpec>,
        window: WindowSpec,
        mode: TimeMode,
        group_by: Option<FieldPath>,
    },
    Select(FieldSpec),
    Collapse {
        field_spec: FieldSpec,
        output: String,
        reducer: Reducer,
        append: bool,
    },
    Dedup(DedupPolicy),
    Take {
        limit: usize,
        window: WindowSpec,
        mode: TimeMode,
        group_by: Option<FieldPath>,
    },
    OffsetBy {
        by: f64,
        field_spec: Option<FieldSpec>,
    },
    Filter(Box<dyn FnMut(&Event) -> bool>),
    Map(Box<dyn FnMut(&Event) -> Event>),
}

/// Builder for processing pipelines.
pub struct PipelineBuilder {
    source: Source,
    emit_on: EmitOn,
    window: WindowSpec,
    mode: TimeMode,
    group_by: Option<FieldPath>,
    stages: Vec<StageConfig>,
}

impl PipelineBuilder {
    fn new(source: Source) -> Self {
        PipelineBuilder {
            source,
            emit_on: EmitOn::default(),
            window: WindowSpec::Global,
            mode: TimeMode::Utc,
            group_by: None,
            stages: Vec::new(),
        }
    }

    /// A pipeline over a bounded source; `run` drives every event through
    /// the chain and flushes.
    pub fn from_collection(collection: Collection) -> Self {
        PipelineBuilder::new(Source::Bounded(collection))
    }

    /// A pipeline over an unbounded source; the caller pushes events and
    /// must call `stop` to surrender buffered state.
    pub fn unbounded() -> Self {
        PipelineBuilder::new(Source::Unbounded)
    }

    /// Set the emission policy for collector-backed stages.
    pub fn emit_on(mut self, emit_on: EmitOn) -> Self {
        self.emit_on = emit_on;
        self
    }

    /// Set the windowing strategy for subsequent aggregate/take stages.
    pub fn window_by(mut self, window: WindowSpec) -> Self {
        self.window = window;
        self
    }

    /// Revert to the global window.
    pub fn clear_window(mut self) -> Self {
        self.window = WindowSpec::Global;
        self
    }

    /// Set the calendar interpretation for subsequent windowed stages.
    pub fn in_time_mode(mut self, mode: TimeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Group subsequent windowed stages by the value at a field path.
    pub fn group_by(mut self, path: impl Into<FieldPath>) -> Self {
        self.group_by = Some(path.into());
        self
    }

    pub fn clear_group_by(mut self) -> Self {
        self.group_by = None;
        self
    }

    /// Add a fill stage.
    pub fn fill(mut self, config: FillConfig) -> Self {
        self.stages.push(StageConfig::Fill(config));
        self
    }

    /// Add an align stage.
    pub fn align(mut self, config: AlignConfig) -> Self {
        self.stages.push(StageConfig::Align(config));
        self
    }

    /// Add a rate stage.
    pub fn rate(mut self, config: RateConfig) -> Self {
        self.stages.push(StageConfig::Rate(config));
        self
    }

    /// Add an aggregation stage over the current window/group settings.
    pub fn aggregate(mut self, specs: Vec<AggregateSpec>) -> Self {
        self.stages.push(StageConfig::Aggregate {
            specs,
            window: self.window.clone(),
            mode: self.mode,
            group_by: self.group_by.clone(),
        });
        self
    }

    /// Add a projection stage.
    pub fn select(mut self, spec: impl Into<FieldSpec>) -> Self {
        self.stages.push(StageConfig::Select(spec.into()));
        self
    }

    /// Add a collapse stage.
    pub fn collapse(
        mut self,
        spec: impl Into<FieldSpec>,
        output: impl Into<String>,
        reducer: Reducer,
        append: bool,
    ) -> Self {
        self.stages.push(StageConfig::Collapse {
            field_spec: spec.into(),
            output: output.into(),
            reducer,
            append,
        });
        self
    }

    /// Add a dedup stage.
    pub fn dedup(mut self, policy: DedupPolicy) -> Self {
        self.stages.push(StageConfig::Dedup(policy));
        self
    }

    /// Add a head-N stage over the current window/group settings.
    pub fn take(mut self, limit: usize) -> Self {
        self.stages.push(StageConfig::Take {
            limit,
            window: self.window.clone(),
            mode: self.mode,
            group_by: self.group_by.clone(),
        });
        self
    }

    /// Add a constant-offset stage over every field.
    pub fn offset_by(self, by: f64) -> Self {
        self.offset_by_fields(by, None)
    }

    /// Add a constant-offset stage over selected fields.
    pub fn offset_by_fields(mut self, by: f64, spec: Option<FieldSpec>) -> Self {
        self.stages.push(StageConfig::OffsetBy {
            by,
            field_spec: spec,
        });
        self
    }

    /// Add a predicate filter stage.
    pub fn filter(mut self, predicate: impl FnMut(&Event) -> bool + 'static) -> Self {
        self.stages.push(StageConfig::Filter(Box::new(predicate)));
        self
    }

    /// Add a mapping stage.
    pub fn map(mut self, op: impl FnMut(&Event) -> Event + 'static) -> Self {
        self.stages.push(StageConfig::Map(Box::new(op)));
        self
    }

    fn validate(&self) -> Result<()> {
        let bounded = matches!(self.source, Source::Bounded(_));

        for stage in &self.stages {
            match stage {
                StageConfig::Fill(config) if config.method == FillMethod::Linear => {
                    // linear fill needs full visibility into a run before
                    // deciding how to fill it
                    if !bounded {
                        return Err(ProcessorError::Config(
                            "linear fill requires a bounded source".to_string(),
                        ));
                    }
                    if self.emit_on != EmitOn::Flush {
                        return Err(ProcessorError::Config(
                            "linear fill requires the flush emission policy".to_string(),
                        ));
                    }
                }
                StageConfig::Aggregate { window, .. } => {
                    if !bounded && !window.is_windowed() {
                        return Err(ProcessorError::Config(
                            "aggregation on an unbounded source needs a windowing strategy"
                                .to_string(),
                        ));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Compile the stage list into an executable pipeline.
    pub fn build(self) -> Result<Pipeline> {
        self.validate()?;

        let diagnostics = Diagnostics::new();
        let emit_on = self.emit_on;

        let mut stages: Vec<Box<dyn Processor>> = Vec::with_capacity(self.stages.len());
        for stage in self.stages {
            let compiled: Box<dyn Processor> = match stage {
                StageConfig::Fill(config) => Box::new(Filler::new(config, diagnostics.clone())),
                StageConfig::Align(config) => {
                    Box::new(Aligner::new(config, diagnostics.clone())?)
                }
                StageConfig::Rate(config) => Box::new(Rate::new(config, diagnostics.clone())),
                StageConfig::Aggregate {
                    specs,
                    window,
                    mode,
                    group_by,
                } => Box::new(Aggregator::new(specs, window, mode, emit_on, group_by)?),
                StageConfig::Select(spec) => Box::new(Selector::new(spec)),
                StageConfig::Collapse {
                    field_spec,
                    output,
                    reducer,
                    append,
                } => Box::new(Collapser::new(field_spec, output, reducer, append)),
                StageConfig::Dedup(policy) => Box::new(Deduper::new(policy)),
                StageConfig::Take {
                    limit,
                    window,
                    mode,
                    group_by,
                } => Box::new(Taker::new(limit, window, mode, group_by)),
                StageConfig::OffsetBy { by, field_spec } => {
                    Box::new(Offset::new(by, field_spec, diagnostics.clone()))
                }
                StageConfig::Filter(predicate) => Box::new(Filter::new(predicate)),
                StageConfig::Map(op) => Box::new(Mapper::new(op)),
            };
            stages.push(compiled);
        }

        let source = match self.source {
            Source::Bounded(collection) => Some(collection),
            Source::Unbounded => None,
        };
        Ok(Pipeline::new(source, stages, diagnostics))
    }

    /// Run a bounded pipeline to completion and return the emitted events.
    pub fn to_event_list(self) -> Result<Vec<Event>> {
        let mut pipeline = self.build()?;
        pipeline.run()?;
        Ok(pipeline.take_events())
    }

    /// Run a bounded pipeline to completion and return the emitted events
    /// as a collection.
    pub fn to_collection(self) -> Result<Collection> {
        let events = self.to_event_list()?;
        Ok(Collection::new(events)?)
    }

    /// Run a bounded pipeline to completion and partition the emitted
    /// events into per-(window, group) collections.
    pub fn to_keyed_collections(self) -> Result<BTreeMap<String, Collection>> {
        let window = self.window.clone();
        let mode = self.mode;
        let group_by = self.group_by.clone();

        let mut pipeline = self.build()?;
        pipeline.run()?;

        let mut collector = Collector::new(window, mode, EmitOn::Flush, group_by);
        for event in pipeline.take_events() {
            collector.add_event(&event)?;
        }

        let mut keyed = BTreeMap::new();
        for capsule in collector.flush() {
            keyed.insert(capsule.sink_key(), capsule.collection);
        }
        Ok(keyed)
    }
}
