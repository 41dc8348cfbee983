//! Core data model for the timeflux time-series toolkit
//!
//! This crate provides the immutable event containers the processing
//! pipeline operates over: events keyed by an instant, a time range or a
//! calendar index, ordered collections of events, and the named TimeSeries
//! that is the serialization boundary to the JSON wire format.

pub mod collection;
pub mod errors;
pub mod event;
pub mod field;
pub mod functions;
pub mod index;
pub mod range;
pub mod series;
pub mod time;
pub mod value;

pub use collection::{dedup_events, Collection, DedupKeep, DedupPolicy};
pub use errors::{Result, SeriesError};
pub use event::{Event, EventKey};
pub use field::{leaf_paths, nested_get, nested_set, FieldPath, FieldSpec};
pub use functions::Reducer;
pub use index::Index;
pub use range::TimeRange;
pub use series::TimeSeries;
pub use time::{dt_from_ms, ms_from_dt, sanitize, window_duration_ms, TimeMode};
pub use value::{as_number, is_valid, number};
