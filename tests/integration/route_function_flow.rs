//! End-to-end behavior of the route function over stubbed collaborators

use super::support::{
    engine, launched, DownStore, FailingRouting, Harness, RecordingBroadcaster, RecordingQueue,
    RecordingStore, StubRouting, StubSearch, ORIGIN, WAYPOINT,
};
use driftbottle::geo::{FixedJitter, Jitter, RandomJitter};
use driftbottle::itinerary::Extension;
use driftbottle::reschedule::Rescheduler;
use driftbottle::route_function::{RouteFunction, MISSING_INPUTS};
use driftbottle::store::{JourneyStore, LeaseStore, MemoryJourneyStore};
use driftbottle::types::{Journey, Point, RouteSegment};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

async fn extend_with(jitter: Arc<dyn Jitter>, journey: &Journey) -> Extension {
    engine(
        Arc::new(StubSearch::echo()),
        Arc::new(StubRouting::new(400.0)),
        jitter,
    )
    .extend(journey)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_bootstrap_chains_origin_through_both_waypoints() {
    let journey = launched("bottle-1");
    let harness = Harness::new(RecordingStore::with(&[journey.clone()]));

    let response = harness.route_function.invoke(&journey.to_json()).await;
    assert_eq!(response.status, 200);

    let updated: Journey = serde_json::from_value(response.body).unwrap();
    assert_eq!(updated.segments().len(), 2);
    assert_eq!(updated.origin(), ORIGIN);
    assert_eq!(updated.endpoint(), WAYPOINT);

    let first = &updated.segments()[0];
    let second = &updated.segments()[1];
    assert_eq!(first.start(), Some(ORIGIN));
    assert_eq!(first.end(), Some(WAYPOINT));
    assert_eq!(second.start(), Some(WAYPOINT));
    assert_eq!(second.end(), Some(WAYPOINT));

    // zero jitter: both searches centered exactly on the origin
    assert_eq!(*harness.search.centers.lock(), vec![ORIGIN, ORIGIN]);
    assert_eq!(harness.store.journey("bottle-1"), updated);
    assert_eq!(harness.side_effects(), (1, 1, 1));
}

#[tokio::test]
async fn test_extend_appends_one_segment() {
    let w1 = Point::new(-76.48, 42.46);
    let w2 = Point::new(-76.47, 42.47);
    let journey = launched("bottle-2").with_appended(
        vec![
            RouteSegment::new(800.0, vec![ORIGIN, w1]),
            RouteSegment::new(2500.0, vec![w1, w2]),
        ],
        w2,
    );
    let harness = Harness::new(RecordingStore::with(&[journey.clone()]));

    let response = harness.route_function.invoke(&journey.to_json()).await;
    assert_eq!(response.status, 200);

    let updated: Journey = serde_json::from_value(response.body).unwrap();
    assert_eq!(updated.segments().len(), 3);
    assert_eq!(updated.origin(), ORIGIN);
    assert_eq!(updated.endpoint(), WAYPOINT);
    assert_eq!(updated.segments()[..2], journey.segments()[..]);

    let leg = &updated.segments()[2];
    assert_eq!(leg.start(), Some(w2));
    assert_eq!(leg.end(), Some(WAYPOINT));

    // search is centered on the original origin, not the current endpoint
    assert_eq!(*harness.search.centers.lock(), vec![ORIGIN]);
    assert_eq!(*harness.routing.requests.lock(), vec![(w2, WAYPOINT)]);
}

#[tokio::test]
async fn test_extend_delay_uses_previous_last_segment() {
    let w1 = Point::new(-76.48, 42.46);
    let journey = launched("bottle-3")
        .with_appended(vec![RouteSegment::new(2.5, vec![ORIGIN, w1])], w1);
    let harness = Harness::build(
        RecordingStore::with(&[journey.clone()]),
        StubSearch::fixed(WAYPOINT),
        StubRouting::new(9000.0),
        RecordingQueue::default(),
    );

    let before = chrono::Utc::now();
    let response = harness.route_function.invoke(&journey.to_json()).await;
    assert_eq!(response.status, 200);

    let scheduled = harness.queue.scheduled.lock();
    let visible_in = scheduled[0].visible_at - before;
    // 2.5 m previous leg -> 2.5 s, not the 9000 s of the new leg
    assert!(visible_in >= chrono::Duration::milliseconds(2500));
    assert!(visible_in < chrono::Duration::seconds(60));
}

#[tokio::test]
async fn test_bootstrap_delay_uses_first_leg() {
    let journey = launched("bottle-4");
    let harness = Harness::build(
        RecordingStore::with(&[journey.clone()]),
        StubSearch::fixed(WAYPOINT),
        StubRouting::new(0.0).then(3.0).then(5000.0),
        RecordingQueue::default(),
    );

    let before = chrono::Utc::now();
    harness.route_function.invoke(&journey.to_json()).await;

    let scheduled = harness.queue.scheduled.lock();
    let visible_in = scheduled[0].visible_at - before;
    assert!(visible_in >= chrono::Duration::seconds(3));
    assert!(visible_in < chrono::Duration::seconds(60));
}

#[tokio::test]
async fn test_deleted_bottle_terminates_without_side_effects() {
    let harness = Harness::new(RecordingStore::default());

    let response = harness
        .route_function
        .invoke(&launched("gone").to_json())
        .await;

    assert_eq!(response.status, 200);
    assert!(response.body["message"].as_str().unwrap().contains("gone"));
    assert_eq!(harness.side_effects(), (0, 0, 0));
    assert_eq!(harness.search.calls(), 0);
    assert_eq!(harness.store.leases_granted.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_fields_rejected_without_side_effects() {
    let journey = launched("bottle-5");
    let harness = Harness::new(RecordingStore::with(&[journey.clone()]));

    for field in ["id", "created", "origin", "endpoint", "routes"] {
        let mut body = journey.to_json();
        body.as_object_mut().unwrap().remove(field);
        let response = harness.route_function.invoke(&body).await;
        assert_eq!(response.status, 400, "missing {field}");
        assert_eq!(response.body, json!({ "error": MISSING_INPUTS }));
    }

    assert_eq!(harness.side_effects(), (0, 0, 0));
    assert_eq!(harness.search.calls(), 0);
}

#[tokio::test]
async fn test_store_outage_is_503_not_termination() {
    let down = Arc::new(DownStore);
    let broadcaster = Arc::new(RecordingBroadcaster::default());
    let queue = Arc::new(RecordingQueue::default());
    let route_function = RouteFunction::new(
        engine(
            Arc::new(StubSearch::fixed(WAYPOINT)),
            Arc::new(StubRouting::new(100.0)),
            Arc::new(FixedJitter(0.0)),
        ),
        down.clone(),
        down.clone(),
        Rescheduler::new(down, broadcaster.clone(), queue.clone()),
    );

    let response = route_function.invoke(&launched("bottle-6").to_json()).await;
    assert_eq!(response.status, 503);
    assert!(response.body["error"].as_str().unwrap().contains("connection refused"));
    assert!(broadcaster.published.lock().is_empty());
    assert!(queue.scheduled.lock().is_empty());
}

#[tokio::test]
async fn test_held_lease_is_409_without_side_effects() {
    let journey = launched("bottle-7");
    let harness = Harness::new(RecordingStore::with(&[journey.clone()]));
    let held = harness
        .store
        .try_acquire("bottle-7", Duration::from_secs(60))
        .unwrap()
        .unwrap();

    let response = harness.route_function.invoke(&journey.to_json()).await;
    assert_eq!(response.status, 409);
    assert_eq!(harness.side_effects(), (0, 0, 0));
    assert_eq!(harness.search.calls(), 0);

    // once released the next invocation proceeds
    harness.store.release(&held).unwrap();
    let response = harness.route_function.invoke(&journey.to_json()).await;
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_lease_released_after_failure() {
    let journey = launched("bottle-8");
    let store = Arc::new(RecordingStore::with(&[journey.clone()]));
    let route_function = RouteFunction::new(
        engine(
            Arc::new(StubSearch::fixed(WAYPOINT)),
            Arc::new(FailingRouting),
            Arc::new(FixedJitter(0.0)),
        ),
        store.clone(),
        store.clone(),
        Rescheduler::new(
            store.clone(),
            Arc::new(RecordingBroadcaster::default()),
            Arc::new(RecordingQueue::default()),
        ),
    );

    let response = route_function.invoke(&journey.to_json()).await;
    assert_eq!(response.status, 500);
    assert!(response.body["error"].as_str().unwrap().starts_with("Route unavailable"));
    assert_eq!(store.writes(), 0);

    // the lease did not outlive the failed invocation
    assert!(store
        .try_acquire("bottle-8", Duration::from_secs(1))
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_schedule_failure_after_persistence_is_500() {
    let journey = launched("bottle-9");
    let harness = Harness::build(
        RecordingStore::with(&[journey.clone()]),
        StubSearch::fixed(WAYPOINT),
        StubRouting::new(100.0),
        RecordingQueue::failing(),
    );

    let response = harness.route_function.invoke(&journey.to_json()).await;
    assert_eq!(response.status, 500);
    assert!(response.body["error"].as_str().unwrap().contains("queue offline"));

    // advanced and broadcast, but nothing queued to move it again
    assert_eq!(harness.store.writes(), 1);
    assert_eq!(harness.broadcaster.published.lock().len(), 1);
    assert_eq!(harness.store.journey("bottle-9").segments().len(), 2);
}

#[tokio::test]
async fn test_stubbed_runs_are_reproducible() {
    let journey = launched("bottle-10");
    let first = extend_with(Arc::new(FixedJitter(0.004)), &journey).await;
    let second = extend_with(Arc::new(FixedJitter(0.004)), &journey).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_random_jitter_diverges() {
    let journey = launched("bottle-11");
    let first = extend_with(Arc::new(RandomJitter), &journey).await;
    let second = extend_with(Arc::new(RandomJitter), &journey).await;
    assert_ne!(first.journey.endpoint(), second.journey.endpoint());
}

#[tokio::test]
async fn test_unknown_id_in_memory_store_never_written() {
    let store = Arc::new(MemoryJourneyStore::new());
    let route_function = RouteFunction::new(
        engine(
            Arc::new(StubSearch::fixed(WAYPOINT)),
            Arc::new(StubRouting::new(10.0)),
            Arc::new(FixedJitter(0.0)),
        ),
        store.clone(),
        store.clone(),
        Rescheduler::new(
            store.clone(),
            Arc::new(RecordingBroadcaster::default()),
            Arc::new(RecordingQueue::default()),
        ),
    );

    route_function.invoke(&launched("ghost").to_json()).await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_cancel_during_extension_is_not_undone() {
    let journey = launched("bottle-12");
    let harness = Harness::build(
        RecordingStore::with(&[journey.clone()]),
        StubSearch::slow(WAYPOINT, Duration::from_millis(200)),
        StubRouting::new(100.0),
        RecordingQueue::default(),
    );

    // the delete lands after the existence check, while the searches run
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        harness.store.remove("bottle-12").unwrap()
    };
    let payload = journey.to_json();
    let (response, removed) = tokio::join!(
        harness.route_function.invoke(&payload),
        cancel
    );

    assert!(removed);
    assert_eq!(response.status, 200);
    assert!(response.body["message"].as_str().unwrap().contains("bottle-12"));
    assert!(!harness.store.contains("bottle-12").unwrap());
    assert_eq!(harness.side_effects(), (0, 0, 0));
    assert_eq!(harness.search.calls(), 2);
}

#[tokio::test]
async fn test_abandoned_invocation_releases_lease() {
    let journey = launched("bottle-13");
    let harness = Harness::build(
        RecordingStore::with(&[journey.clone()]),
        StubSearch::slow(WAYPOINT, Duration::from_secs(5)),
        StubRouting::new(100.0),
        RecordingQueue::default(),
    );

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        harness.route_function.invoke(&journey.to_json()),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(harness.store.leases_granted.load(Ordering::SeqCst), 1);

    // dropping the in-flight invocation gave the lease back
    assert!(harness
        .store
        .try_acquire("bottle-13", Duration::from_secs(1))
        .unwrap()
        .is_some());
    assert_eq!(harness.side_effects(), (0, 0, 0));
}
