mod support;

use domain::{InboundMessage, Reading};
use relay_pipeline::{
    OverlapPolicy, PinBinding, PollRelay, PollSettings, PushRelay, PushSettings, TickOutcome,
};
use relay_config::PollConfig;
use relay_storage::InMemoryReadingStore;
use relay_telemetry::metrics;
use std::sync::Arc;
use std::time::Duration;
use support::{FailingStore, GatedStore, RecordingDashboard};

fn settings(overlap: OverlapPolicy) -> PollSettings {
    PollSettings {
        field: "current".to_string(),
        pin: "V1".to_string(),
        interval: Duration::from_millis(50),
        overlap,
    }
}

#[test]
fn settings_follow_poll_config() {
    let config = PollConfig::from_lookup(|key: &str| match key {
        "RELAY_DATABASE_URL" => Some("postgres://localhost/relay".to_string()),
        "RELAY_DASHBOARD_TOKEN" => Some("tok".to_string()),
        "RELAY_POLL_FIELD" => Some("voltage".to_string()),
        "RELAY_POLL_INTERVAL_MS" => Some("2000".to_string()),
        "RELAY_POLL_OVERLAP" => Some("allow".to_string()),
        _ => None,
    })
    .expect("config");

    let settings = PollSettings::from(&config);
    assert_eq!(settings.field, "voltage");
    assert_eq!(settings.pin, "V1");
    assert_eq!(settings.interval, Duration::from_secs(2));
    assert_eq!(settings.overlap, OverlapPolicy::Allow);
}

#[tokio::test]
async fn empty_table_makes_no_calls() {
    let dashboard = Arc::new(RecordingDashboard::default());
    let relay = PollRelay::new(
        Arc::new(InMemoryReadingStore::new()),
        dashboard.clone(),
        settings(OverlapPolicy::Skip),
    );

    assert_eq!(relay.tick().await, TickOutcome::Empty);
    assert!(dashboard.calls().await.is_empty());
}

#[tokio::test]
async fn forwards_only_the_most_recent_row() {
    let store = Arc::new(InMemoryReadingStore::with_readings(vec![
        Reading::new("sensor/a", 3_000).with_field("current", Some(3.0)),
        Reading::new("sensor/a", 5_000).with_field("current", Some(5.0)),
        Reading::new("sensor/a", 4_000).with_field("current", Some(4.0)),
    ]));
    let dashboard = Arc::new(RecordingDashboard::default());
    let relay = PollRelay::new(store, dashboard.clone(), settings(OverlapPolicy::Skip));

    assert_eq!(relay.tick().await, TickOutcome::Forwarded { value: 5.0 });
    assert_eq!(dashboard.calls().await, vec![("V1".to_string(), 5.0)]);
}

#[tokio::test]
async fn read_failure_skips_tick() {
    let dashboard = Arc::new(RecordingDashboard::default());
    let relay = PollRelay::new(
        Arc::new(FailingStore),
        dashboard.clone(),
        settings(OverlapPolicy::Skip),
    );

    assert_eq!(relay.tick().await, TickOutcome::ReadFailed);
    assert!(dashboard.calls().await.is_empty());
}

#[tokio::test]
async fn empty_field_is_not_forwarded() {
    let store = Arc::new(InMemoryReadingStore::with_readings(vec![
        Reading::new("sensor/a", 1_000).with_field("current", None),
    ]));
    let dashboard = Arc::new(RecordingDashboard::default());
    let relay = PollRelay::new(store, dashboard.clone(), settings(OverlapPolicy::Skip));

    let before = metrics().snapshot().ticks_field_missing;
    assert_eq!(relay.tick().await, TickOutcome::FieldMissing);
    assert!(dashboard.calls().await.is_empty());
    assert!(metrics().snapshot().ticks_field_missing > before);
}

#[tokio::test]
async fn notify_failure_does_not_stop_next_tick() {
    let store = Arc::new(InMemoryReadingStore::with_readings(vec![
        Reading::new("sensor/a", 1_000).with_field("current", Some(1.5)),
    ]));
    let dashboard = Arc::new(RecordingDashboard::failing());
    let relay = PollRelay::new(store, dashboard.clone(), settings(OverlapPolicy::Skip));

    assert_eq!(relay.tick().await, TickOutcome::NotifyFailed);
    assert_eq!(relay.tick().await, TickOutcome::NotifyFailed);
    assert_eq!(dashboard.calls().await.len(), 2);
}

#[tokio::test]
async fn skip_policy_skips_overlapping_tick() {
    let (store, mut entered) = GatedStore::new(
        Reading::new("sensor/a", 1_000).with_field("current", Some(1.5)),
    );
    let store = Arc::new(store);
    let dashboard = Arc::new(RecordingDashboard::default());
    let relay = PollRelay::new(store.clone(), dashboard.clone(), settings(OverlapPolicy::Skip));

    let first = {
        let relay = relay.clone();
        tokio::spawn(async move { relay.tick().await })
    };
    entered.recv().await.expect("first tick entered");

    assert_eq!(relay.tick().await, TickOutcome::Skipped);

    store.release.add_permits(1);
    assert_eq!(
        first.await.expect("join"),
        TickOutcome::Forwarded { value: 1.5 }
    );

    // 上一次结束后不再跳过
    store.release.add_permits(1);
    assert_eq!(relay.tick().await, TickOutcome::Forwarded { value: 1.5 });
    assert_eq!(dashboard.calls().await.len(), 2);
}

#[tokio::test]
async fn allow_policy_runs_overlapping_ticks() {
    let (store, mut entered) = GatedStore::new(
        Reading::new("sensor/a", 1_000).with_field("current", Some(2.0)),
    );
    let store = Arc::new(store);
    let dashboard = Arc::new(RecordingDashboard::default());
    let relay = PollRelay::new(store.clone(), dashboard.clone(), settings(OverlapPolicy::Allow));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let relay = relay.clone();
        handles.push(tokio::spawn(async move { relay.tick().await }));
    }
    entered.recv().await.expect("first tick entered");
    entered.recv().await.expect("second tick entered");

    store.release.add_permits(2);
    for handle in handles {
        assert_eq!(handle.await.expect("join"), TickOutcome::Forwarded { value: 2.0 });
    }
    assert_eq!(dashboard.calls().await.len(), 2);
}

#[tokio::test]
async fn push_failure_does_not_affect_poll() {
    let store = Arc::new(InMemoryReadingStore::new());
    let push = PushRelay::new(
        store.clone(),
        Arc::new(RecordingDashboard::failing()),
        PushSettings {
            fields: vec!["current".to_string()],
            pins: vec![PinBinding {
                field: "current".to_string(),
                pin: "V1".to_string(),
            }],
        },
    );
    let poll_dashboard = Arc::new(RecordingDashboard::default());
    let poll = PollRelay::new(store, poll_dashboard.clone(), settings(OverlapPolicy::Skip));

    let report = push
        .process(InboundMessage {
            topic: "sensor/meter".to_string(),
            payload: br#"{"current": 7.25}"#.to_vec(),
            received_at_ms: 10_000,
        })
        .await
        .expect("processed");
    assert_eq!(report.notify_failed, 1);

    assert_eq!(poll.tick().await, TickOutcome::Forwarded { value: 7.25 });
    assert_eq!(poll_dashboard.calls().await, vec![("V1".to_string(), 7.25)]);
}

#[tokio::test(start_paused = true)]
async fn run_ticks_on_interval() {
    let store = Arc::new(InMemoryReadingStore::with_readings(vec![
        Reading::new("sensor/a", 1_000).with_field("current", Some(9.0)),
    ]));
    let dashboard = Arc::new(RecordingDashboard::default());
    let relay = PollRelay::new(store, dashboard.clone(), settings(OverlapPolicy::Skip));

    let runner = {
        let relay = relay.clone();
        tokio::spawn(async move { relay.run().await })
    };
    // 0ms、50ms、100ms 三次 tick
    tokio::time::sleep(Duration::from_millis(120)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    runner.abort();

    assert_eq!(dashboard.calls().await.len(), 3);
}
