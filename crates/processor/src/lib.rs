//! Streaming pipeline engine for the timeflux time-series toolkit
//!
//! This crate provides the push-based processing pipeline and its stateful
//! processors: filling, boundary alignment, derivative rates, windowed
//! aggregation, deduplication and field-shaping stages, all synchronous
//! and single-pass over the immutable event model from `timeflux-types`.

pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pipeline;
pub mod processors;
pub mod series_ops;
pub mod stage;
pub mod window;

// Re-export commonly used types
pub use collector::{Capsule, Collector};
pub use config::{
    AggregateSpec, AlignConfig, AlignMethod, EmitOn, FillConfig, FillMethod, RateConfig,
};
pub use diagnostics::{Diagnostic, Diagnostics, WarningKind};
pub use error::{ProcessorError, Result};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineState, PipelineStats, StageConfig};
pub use processors::{
    Aggregator, Aligner, Collapser, Deduper, Filler, Filter, Mapper, Offset, Rate, Selector,
    Taker,
};
pub use series_ops::SeriesExt;
pub use stage::Processor;
pub use window::WindowSpec;
