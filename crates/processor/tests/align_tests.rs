//! Integration tests for the align and rate processors.

use serde_json::{json, Value};

use timeflux_processor::{
    AlignConfig, AlignMethod, PipelineBuilder, ProcessorError, RateConfig, SeriesExt,
    WarningKind,
};
use timeflux_types::{as_number, TimeSeries};

fn simple_gap_data() -> TimeSeries {
    TimeSeries::from_wire(&json!({
        "name": "traffic",
        "columns": ["time", "value"],
        "points": [
            [1_471_824_030_000i64, 0.75], // Mon, 22 Aug 2016 00:00:30 GMT
            [1_471_824_105_000i64, 2],    // Mon, 22 Aug 2016 00:01:45 GMT
            [1_471_824_210_000i64, 1],    // Mon, 22 Aug 2016 00:03:30 GMT
            [1_471_824_390_000i64, 1],    // Mon, 22 Aug 2016 00:06:30 GMT
            [1_471_824_510_000i64, 3],    // Mon, 22 Aug 2016 00:08:30 GMT
            // final point in the same window, for coverage
            [1_471_824_525_000i64, 5]     // Mon, 22 Aug 2016 00:08:45 GMT
        ]
    }))
    .unwrap()
}

fn assert_close(value: Option<&Value>, expected: f64) {
    let got = value.and_then(as_number).unwrap();
    assert!(
        (got - expected).abs() < 1e-12,
        "got {got}, expected {expected}"
    );
}

#[test]
fn test_basic_linear_align() {
    let aligned = simple_gap_data().align(AlignConfig::new("1m")).unwrap();

    assert_eq!(aligned.size(), 8);
    assert_close(aligned.at(0).unwrap().get("value"), 1.25);
    assert_close(aligned.at(1).unwrap().get("value"), 1.857_142_857_142_857_2);
    assert_close(aligned.at(2).unwrap().get("value"), 1.285_714_285_714_285_6);
    assert_close(aligned.at(3).unwrap().get("value"), 1.0);
    assert_close(aligned.at(4).unwrap().get("value"), 1.0);
    assert_close(aligned.at(5).unwrap().get("value"), 1.0);
    assert_close(aligned.at(6).unwrap().get("value"), 1.5);
    assert_close(aligned.at(7).unwrap().get("value"), 2.5);
}

#[test]
fn test_basic_hold_align() {
    let aligned = simple_gap_data()
        .align(AlignConfig::new("1m").with_method(AlignMethod::Hold))
        .unwrap();

    assert_eq!(aligned.size(), 8);
    assert_close(aligned.at(0).unwrap().get("value"), 0.75);
    assert_close(aligned.at(1).unwrap().get("value"), 2.0);
    assert_close(aligned.at(2).unwrap().get("value"), 2.0);
    assert_close(aligned.at(3).unwrap().get("value"), 1.0);
    assert_close(aligned.at(4).unwrap().get("value"), 1.0);
    assert_close(aligned.at(5).unwrap().get("value"), 1.0);
    assert_close(aligned.at(6).unwrap().get("value"), 1.0);
    assert_close(aligned.at(7).unwrap().get("value"), 1.0);
}

#[test]
fn test_align_limit() {
    let aligned = simple_gap_data()
        .align(
            AlignConfig::new("1m")
                .with_method(AlignMethod::Hold)
                .with_limit(2),
        )
        .unwrap();

    assert_eq!(aligned.size(), 8);
    assert_close(aligned.at(0).unwrap().get("value"), 0.75);
    assert_close(aligned.at(1).unwrap().get("value"), 2.0);
    assert_close(aligned.at(2).unwrap().get("value"), 2.0);
    // the three-boundary gap exceeds the limit, all of it is nulled
    assert_eq!(aligned.at(3).unwrap().get("value"), Some(&Value::Null));
    assert_eq!(aligned.at(4).unwrap().get("value"), Some(&Value::Null));
    assert_eq!(aligned.at(5).unwrap().get("value"), Some(&Value::Null));
    assert_close(aligned.at(6).unwrap().get("value"), 1.0);
    assert_close(aligned.at(7).unwrap().get("value"), 1.0);

    let aligned = simple_gap_data()
        .align(AlignConfig::new("1m").with_limit(2))
        .unwrap();

    assert_eq!(aligned.size(), 8);
    assert_close(aligned.at(0).unwrap().get("value"), 1.25);
    assert_close(aligned.at(1).unwrap().get("value"), 1.857_142_857_142_857_2);
    assert_close(aligned.at(2).unwrap().get("value"), 1.285_714_285_714_285_6);
    assert_eq!(aligned.at(3).unwrap().get("value"), Some(&Value::Null));
    assert_eq!(aligned.at(4).unwrap().get("value"), Some(&Value::Null));
    assert_eq!(aligned.at(5).unwrap().get("value"), Some(&Value::Null));
    assert_close(aligned.at(6).unwrap().get("value"), 1.5);
    assert_close(aligned.at(7).unwrap().get("value"), 2.5);
}

#[test]
fn test_invalid_point() {
    let ts = TimeSeries::from_wire(&json!({
        "name": "traffic",
        "columns": ["time", "value"],
        "points": [
            [1_471_824_030_000i64, 0.75],
            [1_471_824_105_000i64, 2],
            [1_471_824_210_000i64, 1],
            [1_471_824_390_000i64, 1],
            [1_471_824_510_000i64, "non_numeric_value"],
            [1_471_824_525_000i64, 5]
        ]
    }))
    .unwrap();

    let mut pipeline = PipelineBuilder::from_collection(ts.collection().clone())
        .align(AlignConfig::new("1m"))
        .build()
        .unwrap();
    pipeline.run().unwrap();
    let aligned = pipeline.take_events();

    assert_eq!(aligned.len(), 8);
    assert_close(aligned[5].get("value"), 1.0);
    // the gap bounded by the bad point carries missing markers
    assert_eq!(aligned[6].get("value"), Some(&Value::Null));
    assert_eq!(aligned[7].get("value"), Some(&Value::Null));
    assert_eq!(pipeline.diagnostics().len(), 1);
    assert_eq!(pipeline.diagnostics()[0].kind, WarningKind::NonNumeric);

    // rates over those nulled boundaries are nulled too, with one warning
    let mut pipeline = PipelineBuilder::from_collection(ts.collection().clone())
        .align(AlignConfig::new("1m"))
        .rate(RateConfig::new())
        .build()
        .unwrap();
    pipeline.run().unwrap();
    let rates = pipeline.take_events();

    assert_eq!(rates.len(), 7);
    assert_eq!(rates[5].get("value_rate"), Some(&Value::Null));
    assert_eq!(rates[6].get("value_rate"), Some(&Value::Null));
    assert_eq!(pipeline.diagnostics().len(), 2);
}

#[test]
fn test_rate_magnitude() {
    let ts = TimeSeries::from_wire(&json!({
        "name": "traffic",
        "columns": ["time", "in"],
        "points": [
            [0, 1],
            [30_000, 3],
            [60_000, 10],
            [90_000, 40],
            [120_000, 70],
            [150_000, 130],
            [180_000, 190],
            [210_000, 220],
            [240_000, 300],
            [270_000, 390],
            [300_000, 510]
        ]
    }))
    .unwrap();

    let rate = ts.rate(RateConfig::new().with_field_spec("in")).unwrap();

    // one less than the source
    assert_eq!(rate.size(), ts.size() - 1);
    assert_close(rate.at(2).unwrap().get("in_rate"), 1.0);
    assert_close(rate.at(3).unwrap().get("in_rate"), 1.0);
    assert_close(rate.at(4).unwrap().get("in_rate"), 2.0);
    assert_close(rate.at(8).unwrap().get("in_rate"), 3.0);
    assert_close(rate.at(9).unwrap().get("in_rate"), 4.0);
}

#[test]
fn test_rate_bins() {
    // replicate basic SNMP-style counter rates over aligned bins
    let ts = TimeSeries::from_wire(&json!({
        "name": "traffic",
        "columns": ["time", "value"],
        "points": [
            [89_000, 100],
            [181_000, 200]
        ]
    }))
    .unwrap();

    let rates = ts
        .align(AlignConfig::new("30s"))
        .unwrap()
        .rate(RateConfig::new())
        .unwrap();

    assert_eq!(rates.size(), 3);
    assert_close(rates.at(0).unwrap().get("value_rate"), 1.086_956_521_739_131_3);
    assert_close(rates.at(1).unwrap().get("value_rate"), 1.086_956_521_739_129_3);
    assert_close(rates.at(2).unwrap().get("value_rate"), 1.086_956_521_739_131_3);
}

#[test]
fn test_negative_derivatives() {
    let ts = TimeSeries::from_wire(&json!({
        "name": "traffic",
        "columns": ["time", "value"],
        "points": [
            [89_000, 100],
            [181_000, 50]
        ]
    }))
    .unwrap();

    // a decreasing counter produces negative rates by default
    let rates = ts
        .align(AlignConfig::new("30s"))
        .unwrap()
        .rate(RateConfig::new())
        .unwrap();
    assert_eq!(rates.size(), 3);
    assert_close(rates.at(0).unwrap().get("value_rate"), -0.543_478_260_869_565_6);
    assert_close(rates.at(1).unwrap().get("value_rate"), -0.543_478_260_869_564_6);
    assert_close(rates.at(2).unwrap().get("value_rate"), -0.543_478_260_869_565_3);

    // disallowing negatives turns counter resets into missing markers
    let rates = ts
        .align(AlignConfig::new("30s"))
        .unwrap()
        .rate(RateConfig::new().disallow_negative())
        .unwrap();
    assert_eq!(rates.size(), 3);
    assert_eq!(rates.at(0).unwrap().get("value_rate"), Some(&Value::Null));
    assert_eq!(rates.at(1).unwrap().get("value_rate"), Some(&Value::Null));
    assert_eq!(rates.at(2).unwrap().get("value_rate"), Some(&Value::Null));
}

#[test]
fn test_non_instant_input_rejected() {
    let ticket_range = TimeSeries::from_wire(&json!({
        "name": "outages",
        "columns": ["timerange", "title", "esnet_ticket"],
        "points": [
            [[1_429_673_400_000i64, 1_429_707_600_000i64], "BOOM", "ESNET-20080101-001"],
            [[1_429_673_400_000i64, 1_429_707_600_000i64], "BAM!", "ESNET-20080101-002"]
        ]
    }))
    .unwrap();

    let align_result = ticket_range.align(AlignConfig::new("1m"));
    assert!(matches!(align_result, Err(ProcessorError::Config(_))));

    let rate_result = ticket_range.rate(RateConfig::new());
    assert!(matches!(rate_result, Err(ProcessorError::Config(_))));
}
