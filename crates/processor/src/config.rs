//! Configuration types for pipeline stages
//!
//! Stage configuration is plain serde-friendly data with constructor
//! helpers; everything is validated when the pipeline is compiled, before
//! any event flows.

use serde::{Deserialize, Serialize};

use timeflux_types::{window_duration_ms, FieldPath, FieldSpec, Reducer};

use crate::error::{ProcessorError, Result};

/// When collector-backed stages emit.
///
/// `EachEvent` re-emits the receiving bucket on every contribution, so late
/// events recompute and re-emit (a replacement, not a reordering).
/// `Discards` retires a fixed-window bucket when the first event of a newer
/// bucket arrives. `Flush` defers all emission until the stream ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmitOn {
    EachEvent,
    Discards,
    Flush,
}

impl Default for EmitOn {
    fn default() -> Self {
        EmitOn::EachEvent
    }
}

/// How the filler repairs invalid values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    Zero,
    Pad,
    Linear,
}

/// Fill stage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillConfig {
    /// Paths to fill; when absent, every leaf path found on each event.
    pub field_spec: Option<FieldSpec>,

    pub method: FillMethod,

    /// Cap on consecutively filled values per field; a good value resets
    /// the counter. For linear fill, a run this long is abandoned whole.
    pub fill_limit: Option<usize>,
}

impl FillConfig {
    pub fn new(method: FillMethod) -> Self {
        FillConfig {
            field_spec: None,
            method,
            fill_limit: None,
        }
    }

    pub fn zero() -> Self {
        FillConfig::new(FillMethod::Zero)
    }

    pub fn pad() -> Self {
        FillConfig::new(FillMethod::Pad)
    }

    pub fn linear() -> Self {
        FillConfig::new(FillMethod::Linear)
    }

    pub fn with_field_spec(mut self, spec: impl Into<FieldSpec>) -> Self {
        self.field_spec = Some(spec.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.fill_limit = Some(limit);
        self
    }
}

impl Default for FillConfig {
    fn default() -> Self {
        FillConfig::zero()
    }
}

/// How the aligner produces boundary values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignMethod {
    Linear,
    Hold,
}

/// Align stage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignConfig {
    /// Paths carried onto the boundary events; all other fields drop.
    pub field_spec: FieldSpec,

    /// Window duration label, e.g. `"1m"` or `"30s"`.
    pub window: String,

    pub method: AlignMethod,

    /// Cap on boundaries produced from one bounding pair; a wider gap
    /// yields missing markers for every boundary in it.
    pub limit: Option<usize>,
}

impl AlignConfig {
    pub fn new(window: impl Into<String>) -> Self {
        AlignConfig {
            field_spec: FieldSpec::one("value"),
            window: window.into(),
            method: AlignMethod::Linear,
            limit: None,
        }
    }

    pub fn with_field_spec(mut self, spec: impl Into<FieldSpec>) -> Self {
        self.field_spec = spec.into();
        self
    }

    pub fn with_method(mut self, method: AlignMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Validate the window label.
    pub fn validate(&self) -> Result<i64> {
        window_duration_ms(&self.window)
            .map_err(|e| ProcessorError::Config(format!("align: {e}")))
    }
}

/// Rate stage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateConfig {
    /// Paths to derive rates for; each output field is `<path>_rate`.
    pub field_spec: FieldSpec,

    /// When false, a negative rate becomes the missing marker. For
    /// monotonic counters that reset.
    pub allow_negative: bool,
}

impl RateConfig {
    pub fn new() -> Self {
        RateConfig {
            field_spec: FieldSpec::one("value"),
            allow_negative: true,
        }
    }

    pub fn with_field_spec(mut self, spec: impl Into<FieldSpec>) -> Self {
        self.field_spec = spec.into();
        self
    }

    pub fn disallow_negative(mut self) -> Self {
        self.allow_negative = false;
        self
    }
}

impl Default for RateConfig {
    fn default() -> Self {
        RateConfig::new()
    }
}

/// One aggregated output field: a reducer over the bucket's raw values at
/// the source path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub output: String,
    pub source: FieldPath,
    pub reducer: Reducer,
}

impl AggregateSpec {
    pub fn new(
        output: impl Into<String>,
        source: impl Into<FieldPath>,
        reducer: Reducer,
    ) -> Self {
        AggregateSpec {
            output: output.into(),
            source: source.into(),
            reducer,
        }
    }
}
