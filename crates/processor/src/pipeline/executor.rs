//! Pipeline execution
//!
//! The executor drives events through the compiled chain depth-first: each
//! input event is fully propagated through every stage before the next one
//! is accepted. Lifecycle is `Idle → Streaming → Flushing → Stopped`;
//! stopping forces one flush pass, front-to-back, so every stage
//! surrenders or discards its retained state.

use tracing::debug;

use timeflux_types::{Collection, Event};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{ProcessorError, Result};
use crate::stage::Processor;

/// Pipeline lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Streaming,
    Flushing,
    Stopped,
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Events accepted from the source
    pub events_in: u64,
    /// Events delivered to the sink
    pub events_out: u64,
}

/// An executable chain of processors with a source and a sink.
pub struct Pipeline {
    state: PipelineState,
    source: Option<Collection>,
    stages: Vec<Box<dyn Processor>>,
    results: Vec<Event>,
    diagnostics: Diagnostics,
    stats: PipelineStats,
}

impl Pipeline {
    pub(crate) fn new(
        source: Option<Collection>,
        stages: Vec<Box<dyn Processor>>,
        diagnostics: Diagnostics,
    ) -> Self {
        Pipeline {
            state: PipelineState::Idle,
            source,
            stages,
            results: Vec::new(),
            diagnostics,
            stats: PipelineStats::default(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// The warnings recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.snapshot()
    }

    /// Events delivered to the sink so far.
    pub fn events(&self) -> &[Event] {
        &self.results
    }

    /// Drain the sink.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.results)
    }

    /// Push one event from the source into the chain.
    pub fn push(&mut self, event: Event) -> Result<()> {
        match self.state {
            PipelineState::Idle => self.state = PipelineState::Streaming,
            PipelineState::Streaming => {}
            PipelineState::Flushing | PipelineState::Stopped => {
                return Err(ProcessorError::State(
                    "cannot push into a stopped pipeline".to_string(),
                ));
            }
        }

        self.stats.events_in += 1;
        let delivered = self.dispatch(0, vec![event])?;
        self.deliver(delivered);
        Ok(())
    }

    /// Propagate a batch of events through the chain starting at a stage.
    fn dispatch(&mut self, from: usize, events: Vec<Event>) -> Result<Vec<Event>> {
        let mut batch = events;
        for i in from..self.stages.len() {
            let mut next = Vec::new();
            for event in batch {
                next.extend(self.stages[i].process(event)?);
            }
            batch = next;
            if batch.is_empty() {
                break;
            }
        }
        Ok(batch)
    }

    fn deliver(&mut self, events: Vec<Event>) {
        self.stats.events_out += events.len() as u64;
        self.results.extend(events);
    }

    /// Ask every stage, front-to-back, to surrender its buffered state and
    /// propagate it through the rest of the chain, then stop.
    pub fn flush(&mut self) -> Result<()> {
        if matches!(self.state, PipelineState::Flushing | PipelineState::Stopped) {
            return Err(ProcessorError::State(
                "pipeline already flushed".to_string(),
            ));
        }
        self.state = PipelineState::Flushing;
        debug!(stages = self.stages.len(), "flushing pipeline");

        for i in 0..self.stages.len() {
            let flushed = self.stages[i].flush()?;
            if flushed.is_empty() {
                continue;
            }
            let delivered = self.dispatch(i + 1, flushed)?;
            self.deliver(delivered);
        }

        self.state = PipelineState::Stopped;
        Ok(())
    }

    /// Stop the pipeline, forcing a flush pass if one has not happened.
    /// Idempotent; the pipeline cannot re-enter streaming afterwards.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == PipelineState::Stopped {
            return Ok(());
        }
        self.flush()
    }

    /// Drive a bounded source to completion: push every event, then flush.
    pub fn run(&mut self) -> Result<()> {
        if self.state != PipelineState::Idle {
            return Err(ProcessorError::State(
                "pipeline has already run".to_string(),
            ));
        }
        let source = self.source.take().ok_or_else(|| {
            ProcessorError::State("run requires a bounded source; push events instead".to_string())
        })?;

        debug!(events = source.size(), "running bounded pipeline");
        for event in source.iter() {
            self.push(event.clone())?;
        }
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmitOn, FillConfig};
    use crate::pipeline::builder::PipelineBuilder;
    use serde_json::json;

    fn events() -> Vec<Event> {
        vec![
            Event::at_ms(0, json!({"value": 1})),
            Event::at_ms(1_000, json!({"value": null})),
            Event::at_ms(2_000, json!({"value": 3})),
        ]
    }

    #[test]
    fn test_push_after_stop_is_an_error() {
        let mut pipeline = PipelineBuilder::unbounded()
            .fill(FillConfig::zero())
            .build()
            .unwrap();

        pipeline.push(events().remove(0)).unwrap();
        pipeline.stop().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Stopped);

        let result = pipeline.push(Event::at_ms(5_000, json!({"value": 9})));
        assert!(matches!(result, Err(ProcessorError::State(_))));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut pipeline = PipelineBuilder::unbounded().build().unwrap();
        pipeline.stop().unwrap();
        pipeline.stop().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Stopped);
    }

    #[test]
    fn test_run_twice_is_an_error() {
        let collection = Collection::new(events()).unwrap();
        let mut pipeline = PipelineBuilder::from_collection(collection)
            .build()
            .unwrap();
        pipeline.run().unwrap();
        assert!(pipeline.run().is_err());
    }

    #[test]
    fn test_stats_count_events() {
        let collection = Collection::new(events()).unwrap();
        let mut pipeline = PipelineBuilder::from_collection(collection)
            .fill(FillConfig::zero())
            .build()
            .unwrap();
        pipeline.run().unwrap();
        assert_eq!(pipeline.stats().events_in, 3);
        assert_eq!(pipeline.stats().events_out, 3);
    }

    #[test]
    fn test_flush_emits_buffered_linear_state() {
        let collection = Collection::new(vec![
            Event::at_ms(0, json!({"value": 1})),
            Event::at_ms(1_000, json!({"value": null})),
        ])
        .unwrap();
        let mut pipeline = PipelineBuilder::from_collection(collection)
            .emit_on(EmitOn::Flush)
            .fill(FillConfig::linear().with_field_spec("value"))
            .build()
            .unwrap();
        pipeline.run().unwrap();

        // the unclosed run surfaces at flush, unfilled
        let out = pipeline.take_events();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].get("value"), Some(&serde_json::Value::Null));
    }
}
