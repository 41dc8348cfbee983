//! The processor stage trait
//!
//! A processor is a stateful stream transform. It consumes one event at a
//! time and synchronously returns zero or more output events; buffered
//! state is surrendered on flush. Stage state is exclusively owned by the
//! stage, so there is no locking anywhere in the chain.

use timeflux_types::Event;

use crate::error::Result;

/// A stateful stream transform stage.
pub trait Processor {
    /// Consume one event, producing zero or more output events in
    /// non-decreasing key order.
    fn process(&mut self, event: Event) -> Result<Vec<Event>>;

    /// Emit any retained buffered state; called exactly once, with no
    /// further input to follow.
    fn flush(&mut self) -> Result<Vec<Event>> {
        Ok(Vec::new())
    }

    /// Stage name, used in diagnostics.
    fn name(&self) -> &str;
}
