//! Error types for the stream processor
//!
//! Configuration problems are fatal and surface at stage construction or
//! first-event time; value-level problems never raise and are reported
//! through the diagnostics channel instead.

use thiserror::Error;

use timeflux_types::SeriesError;

/// Main processor error type
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// Invalid stage or pipeline configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Pipeline driven outside its lifecycle, e.g. pushing after stop
    #[error("pipeline state error: {0}")]
    State(String),

    /// Data model errors bubbling up from the types crate
    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Result type alias for processor operations
pub type Result<T> = std::result::Result<T, ProcessorError>;
