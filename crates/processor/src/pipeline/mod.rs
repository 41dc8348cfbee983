//! The pipeline engine
//!
//! A pipeline is an ordered chain of processors plus a source and a sink.
//! The builder assembles an immutable list of stage descriptors and
//! compiles them once into an executable chain; the executor then drives
//! events through the chain depth-first, one at a time, and owns the
//! run/flush/stop lifecycle.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use timeflux_processor::pipeline::PipelineBuilder;
//! use timeflux_processor::config::{FillConfig, EmitOn};
//! use timeflux_types::{Collection, Event};
//!
//! # fn example() -> timeflux_processor::error::Result<()> {
//! let collection = Collection::new(vec![
//!     Event::at_ms(0, json!({"value": 1})),
//!     Event::at_ms(1_000, json!({"value": null})),
//!     Event::at_ms(2_000, json!({"value": 3})),
//! ])?;
//!
//! let events = PipelineBuilder::from_collection(collection)
//!     .emit_on(EmitOn::Flush)
//!     .fill(FillConfig::linear().with_field_spec("value"))
//!     .to_event_list()?;
//!
//! assert_eq!(events.len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod executor;

pub use builder::{PipelineBuilder, StageConfig};
pub use executor::{Pipeline, PipelineState, PipelineStats};
