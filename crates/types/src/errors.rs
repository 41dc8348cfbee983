//! Error types for the data model

use thiserror::Error;

/// Result type alias for data model operations
pub type Result<T> = std::result::Result<T, SeriesError>;

/// Main error type for the data model
///
/// Everything here is fatal at construction time: a value that fails to
/// build never enters a Collection or a Pipeline. Value-level problems
/// during processing are reported through the processor diagnostics channel
/// instead.
#[derive(Error, Debug)]
pub enum SeriesError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unresolved index: {0}")]
    Index(String),

    #[error("invalid time range: {0}")]
    TimeRange(String),

    #[error("timestamp out of range: {0}ms")]
    Timestamp(i64),

    #[error("malformed wire input: {0}")]
    Wire(String),

    #[error("field spec error: {0}")]
    FieldSpec(String),

    #[error("position {0} out of bounds for collection of size {1}")]
    OutOfBounds(usize, usize),

    #[error("homogeneous event keys expected")]
    HeterogeneousKeys,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
