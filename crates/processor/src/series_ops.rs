//! Pipeline-backed TimeSeries transforms
//!
//! `fill`, `align` and `rate` are compositions over the pipeline engine:
//! each builds a bounded flush pipeline over the series' collection and
//! re-wraps the output with the original name and metadata. The input
//! series is never mutated.

use timeflux_types::{Collection, TimeSeries};

use crate::config::{AlignConfig, EmitOn, FillConfig, FillMethod, RateConfig};
use crate::error::Result;
use crate::pipeline::PipelineBuilder;

/// Pipeline-backed transforms for [`TimeSeries`].
pub trait SeriesExt {
    /// Fill missing/invalid values.
    ///
    /// A linear fill over several paths is chained as one filler per path,
    /// so each column fills independently; use the pipeline builder
    /// directly for joint composite-validity semantics across a field set.
    fn fill(&self, config: FillConfig) -> Result<TimeSeries>;

    /// Align onto regular window boundaries.
    fn align(&self, config: AlignConfig) -> Result<TimeSeries>;

    /// Derive rates from consecutive event pairs.
    fn rate(&self, config: RateConfig) -> Result<TimeSeries>;
}

impl SeriesExt for TimeSeries {
    fn fill(&self, config: FillConfig) -> Result<TimeSeries> {
        let mut builder = PipelineBuilder::from_collection(self.collection().clone());

        if config.method == FillMethod::Linear {
            builder = builder.emit_on(EmitOn::Flush);
            match &config.field_spec {
                Some(spec) if spec.len() > 1 => {
                    for path in spec.iter() {
                        builder = builder.fill(FillConfig {
                            field_spec: Some(path.clone().into()),
                            method: FillMethod::Linear,
                            fill_limit: config.fill_limit,
                        });
                    }
                }
                _ => builder = builder.fill(config),
            }
        } else {
            builder = builder.fill(config);
        }

        let events = builder.to_event_list()?;
        Ok(self.with_collection(Collection::new(events)?))
    }

    fn align(&self, config: AlignConfig) -> Result<TimeSeries> {
        let events = PipelineBuilder::from_collection(self.collection().clone())
            .align(config)
            .to_event_list()?;
        Ok(self.with_collection(Collection::new(events)?))
    }

    fn rate(&self, config: RateConfig) -> Result<TimeSeries> {
        let events = PipelineBuilder::from_collection(self.collection().clone())
            .rate(config)
            .to_event_list()?;
        Ok(self.with_collection(Collection::new(events)?))
    }
}
