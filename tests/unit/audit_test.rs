//! Tests for the event log observer

use std::sync::Arc;

use prometheus_channel::core::{EventKind, EventLog, TaskId};
use prometheus_channel::Channel;

#[tokio::test]
async fn test_event_log_records_channel_events() {
    let log = Arc::new(EventLog::new(16));
    let channel = Channel::builder()
        .name("audited")
        .observer(log.clone())
        .build()
        .expect("valid channel");

    let handle = channel.submit(|| async { Ok(1_u8) });
    let id = handle.id();
    assert!(handle.await.is_success());

    let events = log.events();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.channel == "audited"));
    assert!(events.iter().all(|e| e.task_id == Some(id)));
    assert_eq!(
        log.kinds(),
        vec![EventKind::TaskAdded, EventKind::TaskStarted, EventKind::TaskCompleted]
    );
    assert_eq!(events[2].is_success, Some(true));
    assert_eq!(events[0].priority, Some(0));
}

#[tokio::test]
async fn test_event_log_overflow() {
    let log = Arc::new(EventLog::new(2));
    let channel = Channel::builder()
        .observer(log.clone())
        .build()
        .expect("valid channel");

    assert!(channel.submit(|| async { Ok(()) }).await.is_success());

    assert_eq!(
        log.kinds(),
        vec![EventKind::TaskStarted, EventKind::TaskCompleted]
    );
}

#[test]
fn test_event_record_serializes() {
    let log = EventLog::new(4);
    assert!(log.kinds_for(TaskId(1)).is_empty());
    let json = serde_json::to_string(&EventKind::TaskCompleted).expect("serializable");
    assert_eq!(json, "\"TASK_COMPLETED\"");
}
