//! Field projection

use timeflux_types::{Event, FieldSpec};

use crate::error::Result;
use crate::stage::Processor;

/// A processor that keeps only the selected columns of each event.
pub struct Selector {
    name: String,
    field_spec: FieldSpec,
}

impl Selector {
    pub fn new(field_spec: impl Into<FieldSpec>) -> Self {
        Selector {
            name: "select".to_string(),
            field_spec: field_spec.into(),
        }
    }
}

impl Processor for Selector {
    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        Ok(vec![event.select(&self.field_spec)])
    }

    fn name(&self) -> &str {
        &self.name
    }
}
