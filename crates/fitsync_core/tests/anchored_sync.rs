mod common;

use chrono::Duration;
use common::{
    batch, counted_completion, fired, fixed_now, steps_sample, workout_sample, FakePlatform,
    RecordingListener,
};
use fitsync_core::db::open_db;
use fitsync_core::model::workout_activity::WorkoutActivityType;
use fitsync_core::platform::{BackgroundFrequency, FetchBatch, PlatformSample, RecordType};
use fitsync_core::{
    ActivitySummary, Anchor, ConnectorConfig, EventListener, HealthConnector, HealthError,
    HealthEvent, KeyValueStore, MemoryKeyValueStore, QueryStatus, SqliteKeyValueStore,
};
use std::sync::Arc;
use uuid::Uuid;

type MemoryConnector = HealthConnector<FakePlatform, Arc<MemoryKeyValueStore>>;

fn connector_with(platform: FakePlatform, kv: Arc<MemoryKeyValueStore>) -> MemoryConnector {
    HealthConnector::new(platform, kv, ConnectorConfig::default())
        .unwrap()
        .with_clock(fixed_now)
}

fn running_connector() -> (MemoryConnector, Arc<RecordingListener>) {
    let mut connector = connector_with(FakePlatform::available(), Arc::default());
    let listener = Arc::new(RecordingListener::default());
    connector.attach(listener.clone());
    connector.start();
    (connector, listener)
}

fn token_for(bytes: &[u8]) -> String {
    Anchor::from_bytes(bytes.to_vec()).serialize().unwrap()
}

#[test]
fn resumes_from_persisted_anchor_and_commits_the_next_one() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    kv.set("hk-history-anchor", &token_for(b"A0")).unwrap();
    let mut connector = connector_with(FakePlatform::available(), kv.clone());
    assert_eq!(connector.committed_anchor(), Some(&Anchor::from_bytes(b"A0".to_vec())));

    let listener = Arc::new(RecordingListener::default());
    connector.attach(listener.clone());
    connector.start();

    let (completion, counter) = counted_completion();
    connector.on_change_notification(1, completion, None);
    assert_eq!(
        connector.platform().fetches[0].anchor,
        Some(Anchor::from_bytes(b"A0".to_vec()))
    );

    let w1 = Uuid::new_v4();
    connector.on_fetch_result(
        1,
        Ok(batch(vec![workout_sample(w1, WorkoutActivityType::Running)], vec![], b"A1")),
    );

    let deliveries = listener.deliveries();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(
        deliveries[0].event,
        HealthEvent::QueryStatusChanged(QueryStatus::Running)
    );
    let HealthEvent::SamplesCreated(records) = &deliveries[1].event else {
        panic!("expected created samples, got {:?}", deliveries[1].event);
    };
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id(), w1.hyphenated().to_string().to_uppercase());
    assert_eq!(records[0].display(), Some("Running"));

    let token = deliveries[1].transaction.clone().unwrap();
    assert_eq!(token, token_for(b"A1"));
    assert_eq!(fired(&counter), 0);
    assert!(connector.has_pending_completion());

    connector.commit(Some(&token));
    assert_eq!(fired(&counter), 1);
    assert!(!connector.has_pending_completion());
    assert_eq!(connector.committed_anchor(), Some(&Anchor::from_bytes(b"A1".to_vec())));
    assert_eq!(
        connector.anchor_store().restore(),
        Some(Anchor::from_bytes(b"A1".to_vec()))
    );
    assert_eq!(kv.get("hk-history-anchor").unwrap(), Some(token));
}

#[test]
fn uncommitted_results_do_not_move_the_resume_point() {
    let (mut connector, _listener) = running_connector();

    let (first, first_counter) = counted_completion();
    connector.on_change_notification(1, first, None);
    connector.on_fetch_result(
        1,
        Ok(batch(vec![steps_sample(Uuid::new_v4(), 120.0)], vec![], b"A1")),
    );

    let (second, second_counter) = counted_completion();
    connector.on_change_notification(1, second, None);

    let fetches = &connector.platform().fetches;
    assert_eq!(fetches.len(), 2);
    assert_eq!(fetches[0].anchor, None);
    assert_eq!(fetches[1].anchor, None);
    assert_eq!(connector.latest_anchor(), Some(&Anchor::from_bytes(b"A1".to_vec())));

    // The replaced handler is dropped unfired; only the latest one is acknowledged.
    connector.commit(Some(&token_for(b"A1")));
    assert_eq!(fired(&first_counter), 0);
    assert_eq!(fired(&second_counter), 1);
}

#[test]
fn start_registers_once_and_announces_running_once() {
    let (mut connector, listener) = running_connector();
    connector.start();

    assert_eq!(connector.status(), QueryStatus::Running);
    assert_eq!(connector.platform().observers_started.len(), 1);
    assert_eq!(
        connector.platform().background,
        vec![(RecordType::Workout, BackgroundFrequency::Immediate)]
    );
    let running = listener
        .deliveries()
        .into_iter()
        .filter(|delivery| {
            delivery.event == HealthEvent::QueryStatusChanged(QueryStatus::Running)
        })
        .count();
    assert_eq!(running, 1);
}

#[test]
fn observer_covers_the_lookback_window() {
    let (connector, _listener) = running_connector();

    let request = &connector.platform().observers_started[0];
    assert_eq!(request.generation, 1);
    assert_eq!(request.descriptors.len(), 2);
    assert!(request
        .descriptors
        .iter()
        .all(|descriptor| descriptor.start_after == Some(fixed_now() - Duration::days(7))));
}

#[test]
fn start_is_a_noop_without_health_data() {
    let mut connector = connector_with(FakePlatform::unavailable(), Arc::default());
    connector.start();

    assert_eq!(connector.status(), QueryStatus::Stopped);
    assert!(connector.platform().observers_started.is_empty());
    assert_eq!(connector.router().buffered_count(), 0);
}

#[test]
fn stop_is_idempotent_and_announces_stopped() {
    let (mut connector, listener) = running_connector();
    connector.stop();
    connector.stop();

    assert_eq!(connector.status(), QueryStatus::Stopped);
    assert_eq!(connector.platform().observers_stopped, vec![1]);
    let last = listener.deliveries().pop().unwrap();
    assert_eq!(last.event, HealthEvent::QueryStatusChanged(QueryStatus::Stopped));
    assert!(last.transaction.is_none());
}

#[test]
fn undecodable_token_still_acknowledges_without_checkpoint() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    kv.set("hk-history-anchor", &token_for(b"A0")).unwrap();
    let mut connector = connector_with(FakePlatform::available(), kv);
    connector.start();

    let (completion, counter) = counted_completion();
    connector.on_change_notification(1, completion, None);
    connector.commit(Some("not a token"));

    assert_eq!(fired(&counter), 1);
    assert_eq!(connector.committed_anchor(), Some(&Anchor::from_bytes(b"A0".to_vec())));
    assert_eq!(
        connector.anchor_store().restore(),
        Some(Anchor::from_bytes(b"A0".to_vec()))
    );

    // Nothing left to acknowledge.
    connector.commit(Some("not a token"));
    assert_eq!(fired(&counter), 1);
}

#[test]
fn commit_without_token_acknowledges_only() {
    let (mut connector, _listener) = running_connector();
    let (completion, counter) = counted_completion();
    connector.on_change_notification(1, completion, None);

    connector.commit(None);
    assert_eq!(fired(&counter), 1);
    assert_eq!(connector.committed_anchor(), None);
    assert_eq!(connector.anchor_store().restore(), None);
}

#[test]
fn reset_stops_and_forgets_history() {
    let (mut connector, listener) = running_connector();
    connector.commit(Some(&token_for(b"A5")));
    assert!(connector.anchor_store().restore().is_some());

    connector.reset();
    assert_eq!(connector.status(), QueryStatus::Stopped);
    assert_eq!(connector.committed_anchor(), None);
    assert_eq!(connector.anchor_store().restore(), None);
    assert_eq!(
        listener.deliveries().pop().unwrap().event,
        HealthEvent::QueryStatusChanged(QueryStatus::Stopped)
    );

    connector.start();
    let (completion, _counter) = counted_completion();
    connector.on_change_notification(2, completion, None);
    assert_eq!(connector.platform().fetches.last().unwrap().anchor, None);
}

#[test]
fn results_from_a_stopped_subscription_are_dropped() {
    let (mut connector, listener) = running_connector();
    connector.stop();
    connector.start();
    let before = listener.deliveries().len();

    connector.on_fetch_result(
        1,
        Ok(batch(vec![steps_sample(Uuid::new_v4(), 50.0)], vec![], b"stale")),
    );
    assert_eq!(listener.deliveries().len(), before);
    assert_eq!(connector.latest_anchor(), None);

    let (completion, counter) = counted_completion();
    connector.on_change_notification(1, completion, None);
    assert_eq!(fired(&counter), 1);
    assert!(connector.platform().fetches.is_empty());
}

#[test]
fn lenient_mode_accepts_results_from_older_subscriptions() {
    let config = ConnectorConfig {
        strict_cancellation: false,
        ..ConnectorConfig::default()
    };
    let mut connector =
        HealthConnector::new(FakePlatform::available(), MemoryKeyValueStore::new(), config)
            .unwrap()
            .with_clock(fixed_now);
    let listener = Arc::new(RecordingListener::default());
    connector.attach(listener.clone());
    connector.start();
    connector.stop();

    connector.on_fetch_result(
        1,
        Ok(batch(vec![steps_sample(Uuid::new_v4(), 50.0)], vec![], b"late")),
    );
    assert!(matches!(
        listener.deliveries().last().unwrap().event,
        HealthEvent::SamplesCreated(_)
    ));
}

#[test]
fn failed_fetch_emits_nothing_and_keeps_the_completion() {
    let (mut connector, listener) = running_connector();
    let (completion, counter) = counted_completion();
    connector.on_change_notification(1, completion, None);
    let before = listener.deliveries().len();

    connector.on_fetch_result(1, Err("store locked".to_string()));

    assert_eq!(listener.deliveries().len(), before);
    assert_eq!(connector.latest_anchor(), None);
    assert_eq!(fired(&counter), 0);
    assert!(connector.has_pending_completion());
}

#[test]
fn failed_notifications_are_acknowledged_immediately() {
    let (mut connector, _listener) = running_connector();
    let (completion, counter) = counted_completion();
    connector.on_change_notification(1, completion, Some("observer error".to_string()));

    assert_eq!(fired(&counter), 1);
    assert!(connector.platform().fetches.is_empty());
    assert!(!connector.has_pending_completion());

    connector.platform_mut().fail_fetch_start = true;
    let (completion, counter) = counted_completion();
    connector.on_change_notification(1, completion, None);
    assert_eq!(fired(&counter), 1);
    assert!(!connector.has_pending_completion());
}

#[test]
fn empty_or_untracked_batches_route_nothing() {
    let (mut connector, listener) = running_connector();
    let (completion, counter) = counted_completion();
    connector.on_change_notification(1, completion, None);
    let before = listener.deliveries().len();

    connector.on_fetch_result(
        1,
        Ok(FetchBatch {
            anchor: Some(Anchor::from_bytes(b"A1".to_vec())),
            ..FetchBatch::default()
        }),
    );
    let untracked = PlatformSample::Category {
        uuid: Uuid::new_v4(),
        start: fixed_now(),
        end: fixed_now(),
    };
    connector.on_fetch_result(1, Ok(batch(vec![untracked], vec![], b"A2")));

    assert_eq!(listener.deliveries().len(), before);
    assert_eq!(fired(&counter), 0);
}

#[test]
fn created_precede_removed_and_share_one_token() {
    let (mut connector, listener) = running_connector();
    let (completion, _counter) = counted_completion();
    connector.on_change_notification(1, completion, None);

    let gone = Uuid::new_v4();
    connector.on_fetch_result(
        1,
        Ok(batch(vec![steps_sample(Uuid::new_v4(), 900.0)], vec![gone], b"A3")),
    );

    let deliveries = listener.deliveries();
    let tail = &deliveries[deliveries.len() - 2..];
    assert!(matches!(tail[0].event, HealthEvent::SamplesCreated(_)));
    assert_eq!(
        tail[1].event,
        HealthEvent::ObjectsRemoved(vec![gone.hyphenated().to_string().to_uppercase()])
    );
    assert_eq!(tail[0].transaction, tail[1].transaction);
    assert_eq!(tail[0].transaction, Some(token_for(b"A3")));
}

#[test]
fn events_before_attach_are_replayed_once() {
    let mut connector = connector_with(FakePlatform::available(), Arc::default());
    connector.start();
    assert_eq!(connector.router().buffered_count(), 1);

    let first = Arc::new(RecordingListener::default());
    connector.attach(first.clone());
    assert_eq!(
        first.deliveries()[0].event,
        HealthEvent::QueryStatusChanged(QueryStatus::Running)
    );

    let second = Arc::new(RecordingListener::default());
    connector.attach(second.clone());
    assert!(second.deliveries().is_empty());

    let handle: Arc<dyn EventListener> = second.clone();
    connector.detach(&handle);
    assert_eq!(connector.router().listener_count(), 1);
}

#[test]
fn fetch_without_listener_is_buffered_replayed_and_committed_once() {
    let mut connector = connector_with(FakePlatform::available(), Arc::default());
    connector.start();

    let (completion, counter) = counted_completion();
    connector.on_change_notification(1, completion, None);
    let (w1, w2) = (Uuid::new_v4(), Uuid::new_v4());
    connector.on_fetch_result(
        1,
        Ok(batch(
            vec![
                workout_sample(w1, WorkoutActivityType::Running),
                workout_sample(w2, WorkoutActivityType::Cycling),
            ],
            vec![],
            b"A1",
        )),
    );
    assert_eq!(connector.router().buffered_count(), 2);
    assert!(connector.anchor_store().restore().is_none());

    let listener = Arc::new(RecordingListener::default());
    connector.attach(listener.clone());
    assert_eq!(connector.router().buffered_count(), 0);

    let deliveries = listener.deliveries();
    assert_eq!(deliveries.len(), 2);
    let HealthEvent::SamplesCreated(records) = &deliveries[1].event else {
        panic!("expected created samples, got {:?}", deliveries[1].event);
    };
    assert_eq!(records.len(), 2);
    let token = deliveries[1].transaction.clone().unwrap();
    assert_eq!(token, token_for(b"A1"));
    assert_eq!(fired(&counter), 0);

    connector.commit(Some(&token));
    connector.commit(Some(&token));

    assert_eq!(fired(&counter), 1);
    assert_eq!(
        connector.anchor_store().restore(),
        Some(Anchor::from_bytes(b"A1".to_vec()))
    );
    assert_eq!(connector.committed_anchor(), Some(&Anchor::from_bytes(b"A1".to_vec())));
    assert_eq!(listener.deliveries().len(), 2);
}

#[test]
fn committed_anchor_survives_restart_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fitsync.sqlite3");

    {
        let kv = SqliteKeyValueStore::new(open_db(&path).unwrap());
        let mut connector = HealthConnector::new(FakePlatform::available(), kv, ConnectorConfig::default())
            .unwrap()
            .with_clock(fixed_now);
        connector.start();
        connector.commit(Some(&token_for(b"A9")));
    }

    let kv = SqliteKeyValueStore::new(open_db(&path).unwrap());
    let mut connector =
        HealthConnector::new(FakePlatform::available(), kv, ConnectorConfig::default())
            .unwrap()
            .with_clock(fixed_now);
    assert_eq!(connector.committed_anchor(), Some(&Anchor::from_bytes(b"A9".to_vec())));

    connector.start();
    let (completion, _counter) = counted_completion();
    connector.on_change_notification(1, completion, None);
    assert_eq!(
        connector.platform().fetches[0].anchor,
        Some(Anchor::from_bytes(b"A9".to_vec()))
    );
}

#[test]
fn corrupt_checkpoint_restores_as_empty_history() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    kv.set("hk-history-anchor", "%%%").unwrap();

    let connector = connector_with(FakePlatform::available(), kv);
    assert_eq!(connector.committed_anchor(), None);
}

#[test]
fn invalid_config_is_rejected() {
    let config = ConnectorConfig {
        lookback_days: 0,
        ..ConnectorConfig::default()
    };
    assert!(HealthConnector::new(FakePlatform::available(), MemoryKeyValueStore::new(), config).is_err());
}

#[test]
fn today_summary_reports_availability_and_swallows_query_errors() {
    let mut connector = connector_with(FakePlatform::unavailable(), Arc::default());
    assert!(matches!(
        connector.today_summary(),
        Err(HealthError::NotAvailable)
    ));

    let mut platform = FakePlatform::available();
    platform.summary = Some(ActivitySummary {
        active_energy_burned: Some(321.0),
        ..ActivitySummary::default()
    });
    let mut connector = connector_with(platform, Arc::default());
    let summary = connector.today_summary().unwrap().unwrap();
    assert_eq!(summary.active_energy_burned, Some(321.0));
    assert_eq!(
        connector.platform().authorizations.last().unwrap(),
        &vec![RecordType::ActivitySummary]
    );

    connector.platform_mut().fail_summary = true;
    assert_eq!(connector.today_summary().unwrap(), None);
}
