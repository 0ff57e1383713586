//! In-memory journey store, for ephemeral runs and tests

use super::{now_millis, JourneyStore, Lease, LeaseRecord, LeaseStore};
use crate::error::StorageError;
use crate::types::Journey;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Default)]
pub struct MemoryJourneyStore {
    journeys: RwLock<HashMap<String, Journey>>,
    leases: Mutex<HashMap<String, LeaseRecord>>,
}

impl MemoryJourneyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.journeys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.journeys.read().is_empty()
    }
}

impl JourneyStore for MemoryJourneyStore {
    fn get(&self, id: &str) -> Result<Option<Journey>, StorageError> {
        Ok(self.journeys.read().get(id).cloned())
    }

    fn contains(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.journeys.read().contains_key(id))
    }

    fn upsert(&self, journey: &Journey) -> Result<(), StorageError> {
        self.journeys
            .write()
            .insert(journey.id().to_string(), journey.clone());
        Ok(())
    }

    fn update_existing(&self, journey: &Journey) -> Result<bool, StorageError> {
        match self.journeys.write().get_mut(journey.id()) {
            Some(stored) => {
                *stored = journey.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.journeys.write().remove(id).is_some())
    }

    fn ids(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.journeys.read().keys().cloned().collect())
    }
}

impl LeaseStore for MemoryJourneyStore {
    fn try_acquire(&self, bottle_id: &str, ttl: Duration) -> Result<Option<Lease>, StorageError> {
        let now = now_millis();
        let mut leases = self.leases.lock();
        if leases
            .get(bottle_id)
            .map(|record| record.is_live(now))
            .unwrap_or(false)
        {
            return Ok(None);
        }
        let lease = Lease::grant(bottle_id, ttl, now);
        leases.insert(bottle_id.to_string(), lease.record());
        Ok(Some(lease))
    }

    fn release(&self, lease: &Lease) -> Result<(), StorageError> {
        let mut leases = self.leases.lock();
        if leases
            .get(&lease.bottle_id)
            .map(|record| record.token == lease.token)
            .unwrap_or(false)
        {
            leases.remove(&lease.bottle_id);
        }
        Ok(())
    }
}
