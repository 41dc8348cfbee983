//! Constant offset
//!
//! A simple processor used by the pipeline tests to verify chain behavior:
//! adds a constant to the selected fields and emits only those fields.

use serde_json::{Map, Value};

use timeflux_types::{as_number, leaf_paths, nested_set, number, Event, FieldPath, FieldSpec};

use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::Result;
use crate::stage::Processor;

pub struct Offset {
    name: String,
    by: f64,
    field_spec: Option<FieldSpec>,
    diagnostics: Diagnostics,
}

impl Offset {
    pub fn new(by: f64, field_spec: Option<FieldSpec>, diagnostics: Diagnostics) -> Self {
        Offset {
            name: "offset".to_string(),
            by,
            field_spec,
            diagnostics,
        }
    }
}

impl Processor for Offset {
    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        let paths: Vec<FieldPath> = match &self.field_spec {
            Some(spec) => spec.paths().to_vec(),
            None => leaf_paths(event.data()),
        };

        let mut data = Map::new();
        for path in &paths {
            match event.get(path).and_then(as_number) {
                Some(value) => nested_set(&mut data, path, number(value + self.by)),
                None => {
                    self.diagnostics.warn(
                        &self.name,
                        WarningKind::NonNumeric,
                        format!("{path} is not numeric - passing through"),
                    );
                    nested_set(
                        &mut data,
                        path,
                        event.get(path).cloned().unwrap_or(Value::Null),
                    );
                }
            }
        }
        Ok(vec![event.with_data(data)])
    }

    fn name(&self) -> &str {
        &self.name
    }
}
