//! Streaming deduplication
//!
//! Buffers runs of same-key events and resolves each run per the dedup
//! policy when the key changes or the stream flushes. Input is expected in
//! non-decreasing key order, which the pipeline's ordering guarantee
//! provides.

use timeflux_types::{dedup_events, DedupPolicy, Event};

use crate::error::Result;
use crate::stage::Processor;

/// A processor that collapses same-key duplicates.
pub struct Deduper {
    name: String,
    policy: DedupPolicy,
    pending: Vec<Event>,
}

impl Deduper {
    pub fn new(policy: DedupPolicy) -> Self {
        Deduper {
            name: "dedup".to_string(),
            policy,
            pending: Vec::new(),
        }
    }

    fn resolve(&mut self) -> Vec<Event> {
        let pending = std::mem::take(&mut self.pending);
        dedup_events(&pending, self.policy)
    }
}

impl Processor for Deduper {
    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        match self.pending.first() {
            None => {
                self.pending.push(event);
                Ok(Vec::new())
            }
            Some(first) if first.key() == event.key() => {
                self.pending.push(event);
                Ok(Vec::new())
            }
            Some(_) => {
                let resolved = self.resolve();
                self.pending.push(event);
                Ok(resolved)
            }
        }
    }

    fn flush(&mut self) -> Result<Vec<Event>> {
        Ok(self.resolve())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
