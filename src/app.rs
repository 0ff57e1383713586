//! Service wiring: builds the route function and its collaborators from
//! a loaded `DriftConfig`.

use crate::config::{DriftConfig, StorageBackend};
use crate::error::DriftError;
use crate::geo::{Jitter, PathBuilder, RandomJitter, WaypointPicker};
use crate::itinerary::{scheduled_delay, ItineraryEngine};
use crate::provider::{AzureMapsClient, RoutingProvider, SearchProvider};
use crate::reschedule::Rescheduler;
use crate::retrigger::RetriggerDispatcher;
use crate::route_function::RouteFunction;
use crate::schedule::{
    ChannelBroadcaster, DelayedMessage, DelayedQueue, DueMessages, LocalDelayedQueue,
};
use crate::store::{JourneyStore, LeaseStore, MemoryJourneyStore, SledJourneyStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Search and routing collaborators plus the jitter source.
pub struct Providers {
    pub search: Arc<dyn SearchProvider>,
    pub routing: Arc<dyn RoutingProvider>,
    pub jitter: Arc<dyn Jitter>,
}

/// Document store and lease store, usually the same backend.
pub struct Stores {
    pub journeys: Arc<dyn JourneyStore>,
    pub leases: Arc<dyn LeaseStore>,
}

impl Stores {
    pub fn memory() -> Self {
        let store = Arc::new(MemoryJourneyStore::new());
        Self {
            journeys: store.clone(),
            leases: store,
        }
    }

    pub fn sled(path: &Path) -> Result<Self, DriftError> {
        std::fs::create_dir_all(path).map_err(|e| {
            DriftError::Config(format!("Failed to create store directory {:?}: {}", path, e))
        })?;
        let store = Arc::new(SledJourneyStore::new(path)?);
        Ok(Self {
            journeys: store.clone(),
            leases: store,
        })
    }

    pub fn open(config: &DriftConfig, workspace_root: &Path) -> Result<Self, DriftError> {
        match config.storage.backend {
            StorageBackend::Memory => Ok(Self::memory()),
            StorageBackend::Sled => Self::sled(&config.storage.resolve_path(workspace_root)),
        }
    }
}

/// Everything the HTTP adapter and the retrigger loop share.
pub struct Services {
    pub route_function: Arc<RouteFunction>,
    pub journeys: Arc<dyn JourneyStore>,
    pub broadcaster: Arc<ChannelBroadcaster>,
    pub queue: Arc<dyn DelayedQueue>,
    pub dispatcher: Arc<RetriggerDispatcher>,
}

impl Services {
    /// Wire the full service graph. The returned `DueMessages` is the
    /// consumer end of the retrigger queue; hand it to
    /// `RetriggerDispatcher::run`.
    pub fn assemble(
        config: &DriftConfig,
        providers: Providers,
        stores: Stores,
    ) -> Result<(Self, DueMessages), DriftError> {
        let picker = WaypointPicker::new(providers.search, providers.jitter)
            .with_radius(config.maps.search_radius_m)
            .with_timeout(config.maps.timeout());
        let builder = PathBuilder::new(providers.routing).with_timeout(config.maps.timeout());
        let engine = ItineraryEngine::new(picker, builder);

        let broadcaster = Arc::new(ChannelBroadcaster::new(config.broadcast.capacity));
        let (queue, due) = LocalDelayedQueue::new(config.queue.name.clone());
        let queue: Arc<dyn DelayedQueue> = Arc::new(queue);
        let rescheduler =
            Rescheduler::new(stores.journeys.clone(), broadcaster.clone(), queue.clone());

        let route_function = RouteFunction::new(
            engine,
            stores.journeys.clone(),
            stores.leases,
            rescheduler,
        )
        .with_lease_ttl(config.lease.ttl());

        let dispatcher = RetriggerDispatcher::new(
            config.server.route_function_url(),
            config.server.retrigger_timeout(),
        )?;

        Ok((
            Self {
                route_function: Arc::new(route_function),
                journeys: stores.journeys,
                broadcaster,
                queue,
                dispatcher: Arc::new(dispatcher),
            },
            due,
        ))
    }

    /// Queue a retrigger for every stored journey.
    ///
    /// Pending retriggers live only in memory, so after a restart each
    /// journey is rescheduled with the delay its latest extension chose,
    /// counted from now. Unreadable journeys are skipped.
    pub async fn resume_pending(&self) -> Result<usize, DriftError> {
        let mut resumed = 0;
        for id in self.journeys.ids()? {
            let journey = match self.journeys.get(&id) {
                Ok(Some(journey)) => journey,
                Ok(None) => continue,
                Err(e) => {
                    warn!(bottle_id = %id, error = %e, "Skipping unreadable journey");
                    continue;
                }
            };
            let delay = scheduled_delay(&journey);
            self.queue
                .schedule(DelayedMessage::for_journey(&journey, delay)?)
                .await?;
            resumed += 1;
        }
        info!(resumed, queue = %self.queue.queue_name(), "Resumed stored journeys");
        Ok(resumed)
    }

    /// Wire against Azure Maps and the configured store backend.
    pub fn from_config(
        config: &DriftConfig,
        workspace_root: &Path,
    ) -> Result<(Self, DueMessages), DriftError> {
        config.validate().map_err(|errors| {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            DriftError::Config(joined)
        })?;

        let key = config.maps.subscription_key.clone().unwrap_or_default();
        let maps = Arc::new(
            AzureMapsClient::new(key, config.maps.base_url.clone(), config.maps.timeout())
                .map_err(|e| DriftError::Config(e.to_string()))?,
        );
        info!(base_url = %maps.base_url(), "Using Azure Maps for search and routing");

        let providers = Providers {
            search: maps.clone(),
            routing: maps,
            jitter: Arc::new(RandomJitter),
        };
        let stores = Stores::open(config, workspace_root)?;
        info!(backend = ?config.storage.backend, "Journey store opened");

        Self::assemble(config, providers, stores)
    }
}
