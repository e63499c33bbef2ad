//! Threshold classifier: totality, boundaries and scheme validation.

use supply_metrics_core::{
    classifier::{Band, BandScheme, Thresholds},
    config::EngineConfig,
    error::EngineError,
    kpi::metric,
};

#[test]
fn lead_time_boundary_belongs_to_the_better_band() {
    let thresholds = Thresholds::default();
    assert_eq!(thresholds.classify(metric::AVG_LEAD_TIME, Some(3.0)).as_deref(), Some("excellent"));
    assert_eq!(thresholds.classify(metric::AVG_LEAD_TIME, Some(3.01)).as_deref(), Some("good"));
    assert_eq!(thresholds.classify(metric::AVG_LEAD_TIME, Some(7.0)).as_deref(), Some("good"));
    assert_eq!(thresholds.classify(metric::AVG_LEAD_TIME, Some(7.5)).as_deref(), Some("poor"));
}

#[test]
fn fill_rate_bands_run_higher_is_better() {
    let thresholds = Thresholds::default();
    assert_eq!(thresholds.classify(metric::FILL_RATE, Some(0.95)).as_deref(), Some("excellent"));
    assert_eq!(thresholds.classify(metric::FILL_RATE, Some(0.9)).as_deref(), Some("good"));
    assert_eq!(thresholds.classify(metric::FILL_RATE, Some(0.1)).as_deref(), Some("poor"));
}

#[test]
fn every_finite_value_gets_exactly_one_band() {
    let scheme = BandScheme::lower_is_better(vec![
        Band::bounded("fast", 2.0),
        Band::bounded("ok", 5.0),
        Band::open("slow"),
    ]);
    for value in [-1e12, -3.0, 0.0, 2.0, 2.000_001, 5.0, 9.0, 1e12] {
        assert!(scheme.classify(value).is_some(), "value {value} was not classified");
    }
    assert_eq!(scheme.classify(f64::NAN), None);
}

#[test]
fn undefined_values_and_unknown_metrics_have_no_band() {
    let thresholds = Thresholds::default();
    assert_eq!(thresholds.classify(metric::AVG_LEAD_TIME, None), None);
    assert_eq!(thresholds.classify("carbon_per_order", Some(1.0)), None);
}

#[test]
fn malformed_schemes_are_rejected() {
    let closed = BandScheme::lower_is_better(vec![Band::bounded("a", 1.0), Band::bounded("b", 2.0)]);
    assert!(matches!(closed.validate("m"), Err(EngineError::InvalidBands { .. })));

    let unordered = BandScheme::lower_is_better(vec![
        Band::bounded("a", 5.0),
        Band::bounded("b", 3.0),
        Band::open("c"),
    ]);
    assert!(unordered.validate("m").is_err());

    let duplicate = BandScheme::higher_is_better(vec![Band::bounded("a", 5.0), Band::open("a")]);
    assert!(duplicate.validate("m").is_err());

    let empty = BandScheme::higher_is_better(Vec::new());
    assert!(empty.validate("m").is_err());

    assert!(Thresholds::default().validate().is_ok());
}

#[test]
fn invalid_thresholds_fail_config_validation() {
    let mut config = EngineConfig::default_test();
    config.thresholds = Thresholds::default().with_scheme(
        metric::RETURN_RATE,
        BandScheme::lower_is_better(vec![Band::bounded("good", 0.1), Band::bounded("bad", 0.05)]),
    );
    match config.validate() {
        Err(EngineError::InvalidBands { metric: name, .. }) => assert_eq!(name, metric::RETURN_RATE),
        other => panic!("expected InvalidBands, got {other:?}"),
    }
}

#[test]
fn schemes_load_from_json() {
    let json = r#"{
        "on_time_ratio": {
            "direction": "higher_is_better",
            "bands": [
                { "name": "great", "cutoff": 0.9 },
                { "name": "meh" }
            ]
        }
    }"#;
    let thresholds: Thresholds = serde_json::from_str(json).expect("thresholds json");
    assert!(thresholds.validate().is_ok());
    assert_eq!(thresholds.classify("on_time_ratio", Some(0.95)).as_deref(), Some("great"));
    assert_eq!(thresholds.classify("on_time_ratio", Some(0.5)).as_deref(), Some("meh"));
}
