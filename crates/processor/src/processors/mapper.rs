//! User-closure mapping and filtering

use timeflux_types::Event;

use crate::error::Result;
use crate::stage::Processor;

/// A processor that rewrites each event through a user closure.
pub struct Mapper {
    name: String,
    op: Box<dyn FnMut(&Event) -> Event>,
}

impl Mapper {
    pub fn new(op: impl FnMut(&Event) -> Event + 'static) -> Self {
        Mapper {
            name: "map".to_string(),
            op: Box::new(op),
        }
    }
}

impl Processor for Mapper {
    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        Ok(vec![(self.op)(&event)])
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A processor that drops events failing a user predicate.
pub struct Filter {
    name: String,
    predicate: Box<dyn FnMut(&Event) -> bool>,
}

impl Filter {
    pub fn new(predicate: impl FnMut(&Event) -> bool + 'static) -> Self {
        Filter {
            name: "filter".to_string(),
            predicate: Box::new(predicate),
        }
    }
}

impl Processor for Filter {
    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        if (self.predicate)(&event) {
            Ok(vec![event])
        } else {
            Ok(Vec::new())
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
