//! Structured diagnostics channel
//!
//! Value-level problems (bad paths, non-numeric data in numeric stages)
//! degrade gracefully: the affected field is skipped or nulled, a warning
//! is recorded here, and the pipeline keeps running. The channel is a
//! cheaply-clonable handle shared between the pipeline and its stages so a
//! test suite can assert on what was warned about. Every record is also
//! emitted through `tracing`.

use std::sync::{Arc, Mutex};

/// What kind of problem a diagnostic describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A field path that does not exist in the event data
    BadPath,
    /// Non-numeric data on a field a numeric stage was asked to process
    NonNumeric,
    /// A value that could not be processed and was passed through or nulled
    InvalidValue,
    /// Calendar buckets interpreted in local time
    LocalTime,
}

/// A single recorded warning.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: WarningKind,
    pub stage: String,
    pub message: String,
}

/// Shared warning sink.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    inner: Arc<Mutex<Vec<Diagnostic>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// Record a warning.
    pub fn warn(&self, stage: &str, kind: WarningKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage = %stage, kind = ?kind, "{message}");
        self.inner.lock().unwrap().push(Diagnostic {
            kind,
            stage: stage.to_string(),
            message,
        });
    }

    /// A copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.inner.lock().unwrap().clone()
    }

    /// Number of recorded warnings of a kind.
    pub fn count_of(&self, kind: WarningKind) -> usize {
        self.inner.lock().unwrap().iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
