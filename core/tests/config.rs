//! Configuration loading and its effect on the engine.

use attribution_core::{
    breakdown::DealContext, touchpoint::parse_timestamp, AttributionConfig, AttributionEngine,
    AttributionModel, Touchpoint, TouchpointRole,
};

const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

/// The shipped config file carries the same table as the built-in defaults.
#[test]
fn shipped_config_matches_defaults() {
    let loaded = AttributionConfig::load(DATA_DIR).expect("load shipped config");
    assert_eq!(loaded, AttributionConfig::default());
    assert_eq!(loaded.role_weights.weight(&TouchpointRole::Closer), 0.35);
    assert_eq!(loaded.role_weights.weight(&TouchpointRole::Other), 0.05);
}

/// Loading from a directory without the file reports the unreadable path.
#[test]
fn missing_config_dir_is_an_error() {
    let err = AttributionConfig::load("/definitely/not/here").unwrap_err();
    assert!(err.to_string().contains("Cannot read"), "got {err}");
}

/// A zero weight, a zero half-life or a negative tolerance each fail validation.
#[test]
fn validation_rejects_bad_values() {
    let mut config = AttributionConfig::default();
    config.role_weights.demo = 0.0;
    assert!(config.validate().is_err());

    let config = AttributionConfig::default().with_half_life_days(0.0);
    assert!(config.validate().is_err());

    let mut config = AttributionConfig::default();
    config.residual_tolerance = -1.0;
    assert!(config.validate().is_err());

    assert!(AttributionConfig::default().validate().is_ok());
}

/// A config file without a tolerance falls back to one cent.
#[test]
fn residual_tolerance_defaults_when_absent() {
    let json = r#"{
        "role_weights": { "referral": 0.25, "demo": 0.15, "intro": 0.15,
                          "support": 0.10, "closer": 0.35, "other": 0.05 },
        "half_life_days": 7.0
    }"#;
    let config: AttributionConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.residual_tolerance, 0.01);
}

/// Seven days apart: 2:1 at the default half-life, 128:1 at a one-day half-life.
#[test]
fn shorter_half_life_sharpens_time_decay() {
    let touchpoints = vec![
        Touchpoint::new(
            "old",
            "Old Partner",
            "deal-1",
            parse_timestamp("2024-01-01T00:00:00Z").unwrap(),
            TouchpointRole::Referral,
        ),
        Touchpoint::new(
            "new",
            "New Partner",
            "deal-1",
            parse_timestamp("2024-01-08T00:00:00Z").unwrap(),
            TouchpointRole::Closer,
        ),
    ];
    let deal = DealContext {
        deal_id: "deal-1".into(),
        amount: 1_000.0,
        model: AttributionModel::TimeDecay,
    };
    let now = parse_timestamp("2024-02-01T00:00:00Z").unwrap();

    // Seven days apart at a seven-day half-life: 2:1.
    let weekly = AttributionEngine::new(AttributionConfig::default())
        .compute_attribution(&deal, &touchpoints, now)
        .unwrap();
    assert_eq!(weekly.for_partner("new").unwrap().payout, 666.67);
    assert_eq!(weekly.for_partner("old").unwrap().payout, 333.33);

    // At a one-day half-life the older touch is worth 1/128 of the newer.
    let daily = AttributionEngine::new(AttributionConfig::default().with_half_life_days(1.0))
        .compute_attribution(&deal, &touchpoints, now)
        .unwrap();
    let old = daily.for_partner("old").unwrap();
    assert!(old.percentage < 1.0, "old share {}", old.percentage);
    assert_eq!(old.payout, 7.75);
}
