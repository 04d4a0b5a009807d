//! Tests for error types

use prometheus_channel::core::ChannelError;

#[test]
fn test_invalid_config_error() {
    let err = ChannelError::InvalidConfig("concurrency_limit must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: concurrency_limit must be greater than 0"
    );
}

#[test]
fn test_task_panicked_error() {
    let err = ChannelError::TaskPanicked("index out of bounds".to_string());
    assert_eq!(format!("{}", err), "task panicked: index out of bounds");
}

#[test]
fn test_env_error() {
    let err = ChannelError::Env("CHANNEL_CONCURRENCY=x".to_string());
    assert_eq!(format!("{}", err), "environment error: CHANNEL_CONCURRENCY=x");
}

#[test]
fn test_channel_error_survives_anyhow_round_trip() {
    let err: anyhow::Error = ChannelError::TaskPanicked("boom".into()).into();
    assert!(matches!(
        err.downcast_ref::<ChannelError>(),
        Some(ChannelError::TaskPanicked(_))
    ));
}
