//! Test doubles for the route function's collaborators

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use driftbottle::error::{DriftError, ProviderError, StorageError};
use driftbottle::geo::{FixedJitter, Jitter, PathBuilder, WaypointPicker};
use driftbottle::itinerary::ItineraryEngine;
use driftbottle::provider::{RoutingProvider, SearchProvider};
use driftbottle::reschedule::Rescheduler;
use driftbottle::route_function::RouteFunction;
use driftbottle::schedule::{BroadcastMessage, Broadcaster, DelayedMessage, DelayedQueue};
use driftbottle::store::{JourneyStore, Lease, LeaseStore, MemoryJourneyStore};
use driftbottle::types::{Journey, Point, RouteSegment};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const ORIGIN: Point = Point {
    lon: -76.50,
    lat: 42.45,
};
pub const WAYPOINT: Point = Point {
    lon: -76.49,
    lat: 42.44,
};

pub fn launched(id: &str) -> Journey {
    Journey::new(
        id,
        Utc.with_ymd_and_hms(2021, 3, 14, 15, 9, 26).unwrap(),
        ORIGIN,
    )
}

/// Search stub returning either a fixed point or the query center.
pub struct StubSearch {
    fixed: Option<Point>,
    latency: Duration,
    pub centers: Mutex<Vec<Point>>,
}

impl StubSearch {
    pub fn fixed(point: Point) -> Self {
        Self {
            fixed: Some(point),
            latency: Duration::ZERO,
            centers: Mutex::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self {
            fixed: None,
            latency: Duration::ZERO,
            centers: Mutex::new(Vec::new()),
        }
    }

    /// Fixed result, answered only after `latency`
    pub fn slow(point: Point, latency: Duration) -> Self {
        Self {
            latency,
            ..Self::fixed(point)
        }
    }

    pub fn calls(&self) -> usize {
        self.centers.lock().len()
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search_nearby(
        &self,
        center: Point,
        _radius_m: f64,
        _limit: usize,
    ) -> Result<Vec<Point>, ProviderError> {
        self.centers.lock().push(center);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(vec![self.fixed.unwrap_or(center)])
    }

    fn provider_name(&self) -> &str {
        "stub-search"
    }
}

/// Routing stub: straight line through a midpoint with a scripted length.
pub struct StubRouting {
    distances: Mutex<VecDeque<f64>>,
    default_distance: f64,
    pub requests: Mutex<Vec<(Point, Point)>>,
}

impl StubRouting {
    pub fn new(default_distance: f64) -> Self {
        Self {
            distances: Mutex::new(VecDeque::new()),
            default_distance,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, distance: f64) -> Self {
        self.distances.lock().push_back(distance);
        self
    }
}

#[async_trait]
impl RoutingProvider for StubRouting {
    async fn route(&self, start: Point, end: Point) -> Result<RouteSegment, ProviderError> {
        self.requests.lock().push((start, end));
        let distance = self
            .distances
            .lock()
            .pop_front()
            .unwrap_or(self.default_distance);
        let mid = Point::new((start.lon + end.lon) / 2.0, (start.lat + end.lat) / 2.0);
        Ok(RouteSegment::new(distance, vec![start, mid, end]))
    }

    fn provider_name(&self) -> &str {
        "stub-routing"
    }
}

/// Routing provider that always fails
pub struct FailingRouting;

#[async_trait]
impl RoutingProvider for FailingRouting {
    async fn route(&self, _start: Point, _end: Point) -> Result<RouteSegment, ProviderError> {
        Err(ProviderError::RequestFailed("no route".to_string()))
    }

    fn provider_name(&self) -> &str {
        "failing-routing"
    }
}

/// Memory store that counts writes
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryJourneyStore,
    pub upserts: AtomicUsize,
    pub leases_granted: AtomicUsize,
}

impl RecordingStore {
    pub fn with(journeys: &[Journey]) -> Self {
        let store = Self::default();
        for journey in journeys {
            store.inner.upsert(journey).unwrap();
        }
        store
    }

    pub fn journey(&self, id: &str) -> Journey {
        self.inner.get(id).unwrap().expect("journey persisted")
    }

    pub fn writes(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

impl JourneyStore for RecordingStore {
    fn get(&self, id: &str) -> Result<Option<Journey>, StorageError> {
        self.inner.get(id)
    }

    fn contains(&self, id: &str) -> Result<bool, StorageError> {
        self.inner.contains(id)
    }

    fn upsert(&self, journey: &Journey) -> Result<(), StorageError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(journey)
    }

    fn update_existing(&self, journey: &Journey) -> Result<bool, StorageError> {
        let written = self.inner.update_existing(journey)?;
        if written {
            self.upserts.fetch_add(1, Ordering::SeqCst);
        }
        Ok(written)
    }

    fn remove(&self, id: &str) -> Result<bool, StorageError> {
        self.inner.remove(id)
    }

    fn ids(&self) -> Result<Vec<String>, StorageError> {
        self.inner.ids()
    }
}

impl LeaseStore for RecordingStore {
    fn try_acquire(&self, bottle_id: &str, ttl: Duration) -> Result<Option<Lease>, StorageError> {
        let lease = self.inner.try_acquire(bottle_id, ttl)?;
        if lease.is_some() {
            self.leases_granted.fetch_add(1, Ordering::SeqCst);
        }
        Ok(lease)
    }

    fn release(&self, lease: &Lease) -> Result<(), StorageError> {
        self.inner.release(lease)
    }
}

/// Store whose backend is unreachable
pub struct DownStore;

fn refused() -> StorageError {
    StorageError::Backend("connection refused".to_string())
}

impl JourneyStore for DownStore {
    fn get(&self, _id: &str) -> Result<Option<Journey>, StorageError> {
        Err(refused())
    }

    fn contains(&self, _id: &str) -> Result<bool, StorageError> {
        Err(refused())
    }

    fn upsert(&self, _journey: &Journey) -> Result<(), StorageError> {
        Err(refused())
    }

    fn update_existing(&self, _journey: &Journey) -> Result<bool, StorageError> {
        Err(refused())
    }

    fn remove(&self, _id: &str) -> Result<bool, StorageError> {
        Err(refused())
    }

    fn ids(&self) -> Result<Vec<String>, StorageError> {
        Err(refused())
    }
}

impl LeaseStore for DownStore {
    fn try_acquire(&self, _bottle_id: &str, _ttl: Duration) -> Result<Option<Lease>, StorageError> {
        Err(refused())
    }

    fn release(&self, _lease: &Lease) -> Result<(), StorageError> {
        Err(refused())
    }
}

#[derive(Default)]
pub struct RecordingBroadcaster {
    pub published: Mutex<Vec<BroadcastMessage>>,
}

impl Broadcaster for RecordingBroadcaster {
    fn publish(&self, message: &BroadcastMessage) -> Result<usize, DriftError> {
        self.published.lock().push(message.clone());
        Ok(1)
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    pub scheduled: Mutex<Vec<DelayedMessage>>,
    pub fail: bool,
}

impl RecordingQueue {
    pub fn failing() -> Self {
        Self {
            scheduled: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl DelayedQueue for RecordingQueue {
    async fn schedule(&self, message: DelayedMessage) -> Result<(), DriftError> {
        if self.fail {
            return Err(DriftError::ScheduleFailure("queue offline".to_string()));
        }
        self.scheduled.lock().push(message);
        Ok(())
    }

    fn queue_name(&self) -> &str {
        "recording"
    }
}

pub fn engine(
    search: Arc<dyn SearchProvider>,
    routing: Arc<dyn RoutingProvider>,
    jitter: Arc<dyn Jitter>,
) -> ItineraryEngine {
    ItineraryEngine::new(
        WaypointPicker::new(search, jitter),
        PathBuilder::new(routing),
    )
}

/// A route function over stubs, with every side effect observable.
pub struct Harness {
    pub route_function: RouteFunction,
    pub store: Arc<RecordingStore>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub queue: Arc<RecordingQueue>,
    pub search: Arc<StubSearch>,
    pub routing: Arc<StubRouting>,
}

impl Harness {
    pub fn new(store: RecordingStore) -> Self {
        Self::build(
            store,
            StubSearch::fixed(WAYPOINT),
            StubRouting::new(1200.0),
            RecordingQueue::default(),
        )
    }

    pub fn build(
        store: RecordingStore,
        search: StubSearch,
        routing: StubRouting,
        queue: RecordingQueue,
    ) -> Self {
        let store = Arc::new(store);
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let queue = Arc::new(queue);
        let search = Arc::new(search);
        let routing = Arc::new(routing);

        let rescheduler = Rescheduler::new(store.clone(), broadcaster.clone(), queue.clone());
        let route_function = RouteFunction::new(
            engine(search.clone(), routing.clone(), Arc::new(FixedJitter(0.0))),
            store.clone(),
            store.clone(),
            rescheduler,
        );

        Self {
            route_function,
            store,
            broadcaster,
            queue,
            search,
            routing,
        }
    }

    pub fn side_effects(&self) -> (usize, usize, usize) {
        (
            self.store.writes(),
            self.broadcaster.published.lock().len(),
            self.queue.scheduled.lock().len(),
        )
    }
}
