//! Panel configuration loaded from JSON calibration files.
//!
//! Run with: cargo test -p epd-g1 --features serde --test config_serde

#![allow(clippy::unwrap_used)]

use epd_g1::{ConfigError, PanelConfig, PanelSize, WaveformTable};

#[test]
fn default_config_survives_json() {
    let config = PanelConfig::builder(PanelSize::Inch2_7).build().unwrap();
    let json = serde_json::to_string(&config).unwrap();
    let back: PanelConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
    assert_eq!(back.validate(), Ok(()));
}

#[test]
fn hand_written_calibration_loads() {
    let json = r#"{
        "size": "Inch2",
        "lines": { "panel_on": 10, "reset": 11, "border": 12, "busy": 13, "discharge": 14 },
        "busy_policy": { "max_polls": 500, "poll_interval_us": 20 },
        "clock": { "period_ns": 5000, "duty": 40 },
        "discharge_settle_ms": 200,
        "waveforms": {
            "bands": [
                { "below_celsius": 0, "stage_hold_ms": 2000 },
                { "below_celsius": 25, "stage_hold_ms": 800 }
            ],
            "above_hold_ms": 500
        }
    }"#;
    let config: PanelConfig = serde_json::from_str(json).unwrap();
    config.validate().unwrap();
    assert_eq!(config.size(), PanelSize::Inch2);
    assert_eq!(config.lines().busy, 13);
    assert_eq!(config.clock().duty.get(), 40);
    assert_eq!(config.waveforms().profile_for(-3).stage_hold_ms, 2000);
    assert_eq!(config.waveforms().profile_for(30).stage_hold_ms, 500);
}

#[test]
fn rising_hold_times_are_rejected_on_load() {
    let json = r#"{
        "bands": [
            { "below_celsius": 0, "stage_hold_ms": 800 },
            { "below_celsius": 25, "stage_hold_ms": 2000 }
        ],
        "above_hold_ms": 500
    }"#;
    assert!(serde_json::from_str::<WaveformTable>(json).is_err());
}

#[test]
fn duty_above_hundred_is_rejected_on_load() {
    assert!(serde_json::from_str::<epd_g1::DutyPercent>("150").is_err());
    assert_eq!(serde_json::from_str::<epd_g1::DutyPercent>("75").unwrap().get(), 75);
}

#[test]
fn line_collisions_are_rejected_on_load() {
    let config = PanelConfig::builder(PanelSize::Inch1_44).build().unwrap();
    let mut value = serde_json::to_value(&config).unwrap();
    value["lines"]["busy"] = serde_json::json!(5);
    let err = serde_json::from_value::<PanelConfig>(value).unwrap_err();
    assert_eq!(err.to_string(), ConfigError::DuplicateLine(5).to_string());
}

#[test]
fn zero_poll_budget_is_rejected_on_load() {
    let config = PanelConfig::builder(PanelSize::Inch2).build().unwrap();
    let mut value = serde_json::to_value(&config).unwrap();
    value["busy_policy"]["max_polls"] = serde_json::json!(0);
    let err = serde_json::from_value::<PanelConfig>(value).unwrap_err();
    assert_eq!(err.to_string(), ConfigError::ZeroBusyPolls.to_string());
}

#[test]
fn zero_clock_period_is_rejected_on_load() {
    let config = PanelConfig::builder(PanelSize::Inch2_7).build().unwrap();
    let mut value = serde_json::to_value(&config).unwrap();
    value["clock"]["period_ns"] = serde_json::json!(0);
    assert!(serde_json::from_value::<PanelConfig>(value).is_err());
}
