//! Tests for builder modules

use prometheus_channel::builders::ChannelBuilder;
use prometheus_channel::config::{ChannelConfig, DeferralConfig};

#[test]
fn test_channel_builder_defaults() {
    let builder = ChannelBuilder::new();
    assert_eq!(builder.configured_name(), "default");
    assert_eq!(builder.configured_limit(), 1);
}

#[test]
fn test_channel_builder_from_config() {
    let config = ChannelConfig {
        name: "pool1".into(),
        concurrency_limit: 4,
        deferral: DeferralConfig::Immediate,
    };

    let builder = ChannelBuilder::from_config(&config).expect("valid config");
    assert_eq!(builder.configured_name(), "pool1");
    assert_eq!(builder.configured_limit(), 4);
}

#[test]
fn test_channel_builder_rejects_invalid() {
    assert!(ChannelBuilder::new().concurrency_limit(0).build().is_err());
    assert!(ChannelBuilder::new().name("").build().is_err());

    let config = ChannelConfig {
        concurrency_limit: 0,
        ..ChannelConfig::default()
    };
    assert!(ChannelBuilder::from_config(&config).is_err());
}

#[tokio::test]
async fn test_channel_builder_builds_working_channel() {
    let channel = ChannelBuilder::new()
        .name("built")
        .concurrency_limit(3)
        .build()
        .expect("valid channel");

    assert_eq!(channel.name(), "built");
    assert_eq!(channel.concurrency_limit(), 3);
    assert_eq!(channel.submit(|| async { Ok(9) }).await.value(), Some(9));
}
