//! Tests for configuration validation

use std::collections::HashMap;

use prometheus_channel::config::{ChannelConfig, DeferralConfig};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_channel_config_defaults() {
    let config = ChannelConfig::default();
    assert_eq!(config.name, "default");
    assert_eq!(config.concurrency_limit, 1);
    assert_eq!(config.deferral, DeferralConfig::NextTick);
    assert!(config.validate().is_ok());
}

#[test]
fn test_channel_config_invalid_limit() {
    let invalid = ChannelConfig {
        concurrency_limit: 0,
        ..ChannelConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_channel_config_invalid_name() {
    let invalid = ChannelConfig {
        name: "  ".into(),
        ..ChannelConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_channel_config_invalid_timer() {
    let invalid = ChannelConfig {
        deferral: DeferralConfig::Timer { delay_ms: 0 },
        ..ChannelConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_channel_config_from_json() {
    let json = r#"{
        "name": "inference",
        "concurrency_limit": 4,
        "deferral": { "kind": "timer", "delay_ms": 16 }
    }"#;

    let config = ChannelConfig::from_json_str(json).expect("valid config");
    assert_eq!(config.name, "inference");
    assert_eq!(config.concurrency_limit, 4);
    assert_eq!(config.deferral, DeferralConfig::Timer { delay_ms: 16 });
}

#[test]
fn test_channel_config_from_json_fills_defaults() {
    let config = ChannelConfig::from_json_str(r#"{ "concurrency_limit": 2 }"#).expect("valid config");
    assert_eq!(config.name, "default");
    assert_eq!(config.deferral, DeferralConfig::NextTick);
}

#[test]
fn test_channel_config_from_json_rejects_zero_limit() {
    assert!(ChannelConfig::from_json_str(r#"{ "concurrency_limit": 0 }"#).is_err());
    assert!(ChannelConfig::from_json_str("not json").is_err());
}

#[test]
fn test_channel_config_from_lookup() {
    let config = ChannelConfig::from_lookup(lookup(&[
        ("CHANNEL_NAME", "jobs"),
        ("CHANNEL_CONCURRENCY", "3"),
        ("CHANNEL_DEFERRAL", "timer"),
        ("CHANNEL_TIMER_DELAY_MS", "8"),
    ]))
    .expect("valid env");

    assert_eq!(config.name, "jobs");
    assert_eq!(config.concurrency_limit, 3);
    assert_eq!(config.deferral, DeferralConfig::Timer { delay_ms: 8 });
}

#[test]
fn test_channel_config_from_lookup_auto_concurrency() {
    let config = ChannelConfig::from_lookup(lookup(&[("CHANNEL_CONCURRENCY", "auto")])).expect("valid env");
    assert!(config.concurrency_limit >= 1);
}

#[test]
fn test_channel_config_from_lookup_rejects_garbage() {
    assert!(ChannelConfig::from_lookup(lookup(&[("CHANNEL_CONCURRENCY", "many")])).is_err());
    assert!(ChannelConfig::from_lookup(lookup(&[("CHANNEL_DEFERRAL", "someday")])).is_err());
    assert!(ChannelConfig::from_lookup(lookup(&[("CHANNEL_CONCURRENCY", "0")])).is_err());
}

#[test]
fn test_channel_config_from_lookup_empty_is_default() {
    let config = ChannelConfig::from_lookup(lookup(&[])).expect("valid env");
    assert_eq!(config, ChannelConfig::default());
}
