//! Field collapsing

use timeflux_types::{Event, FieldSpec, Reducer};

use crate::error::Result;
use crate::stage::Processor;

/// A processor that reduces the selected columns of each event into one
/// derived column, optionally keeping the originals.
pub struct Collapser {
    name: String,
    field_spec: FieldSpec,
    output: String,
    reducer: Reducer,
    append: bool,
}

impl Collapser {
    pub fn new(
        field_spec: impl Into<FieldSpec>,
        output: impl Into<String>,
        reducer: Reducer,
        append: bool,
    ) -> Self {
        Collapser {
            name: "collapse".to_string(),
            field_spec: field_spec.into(),
            output: output.into(),
            reducer,
            append,
        }
    }
}

impl Processor for Collapser {
    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        Ok(vec![event.collapse(
            &self.field_spec,
            &self.output,
            self.reducer,
            self.append,
        )])
    }

    fn name(&self) -> &str {
        &self.name
    }
}
