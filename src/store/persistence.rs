//! Sled-backed journey store

use super::{
    decode_journey, encode_journey, now_millis, JourneyStore, Lease, LeaseRecord, LeaseStore,
};
use crate::error::StorageError;
use crate::types::Journey;
use std::path::Path;
use std::time::Duration;

const JOURNEYS_TREE: &str = "journeys";
const LEASES_TREE: &str = "leases";

/// Sled-based implementation of JourneyStore and LeaseStore
pub struct SledJourneyStore {
    db: sled::Db,
    journeys: sled::Tree,
    leases: sled::Tree,
}

impl SledJourneyStore {
    /// Open (or create) the store at the given directory
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)
            .map_err(|e| StorageError::Backend(format!("Failed to open sled database: {}", e)))?;
        Self::from_db(db)
    }

    pub fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let journeys = db.open_tree(JOURNEYS_TREE)?;
        let leases = db.open_tree(LEASES_TREE)?;
        Ok(Self {
            db,
            journeys,
            leases,
        })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl JourneyStore for SledJourneyStore {
    fn get(&self, id: &str) -> Result<Option<Journey>, StorageError> {
        match self.journeys.get(id.as_bytes())? {
            Some(value) => Ok(Some(decode_journey(id, &value)?)),
            None => Ok(None),
        }
    }

    fn contains(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.journeys.contains_key(id.as_bytes())?)
    }

    fn upsert(&self, journey: &Journey) -> Result<(), StorageError> {
        let value = encode_journey(journey)?;
        self.journeys.insert(journey.id().as_bytes(), value)?;
        self.journeys.flush()?;
        Ok(())
    }

    fn update_existing(&self, journey: &Journey) -> Result<bool, StorageError> {
        let key = journey.id().as_bytes();
        let value = encode_journey(journey)?;

        loop {
            let Some(current) = self.journeys.get(key)? else {
                return Ok(false);
            };
            match self
                .journeys
                .compare_and_swap(key, Some(current), Some(value.clone()))?
            {
                Ok(()) => {
                    self.journeys.flush()?;
                    return Ok(true);
                }
                // Replaced or removed since the read; look again
                Err(_) => continue,
            }
        }
    }

    fn remove(&self, id: &str) -> Result<bool, StorageError> {
        let removed = self.journeys.remove(id.as_bytes())?.is_some();
        self.journeys.flush()?;
        Ok(removed)
    }

    fn ids(&self) -> Result<Vec<String>, StorageError> {
        let mut ids = Vec::new();
        for key in self.journeys.iter().keys() {
            let key = key?;
            ids.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(ids)
    }
}

impl LeaseStore for SledJourneyStore {
    fn try_acquire(&self, bottle_id: &str, ttl: Duration) -> Result<Option<Lease>, StorageError> {
        let key = bottle_id.as_bytes();
        let now = now_millis();
        let lease = Lease::grant(bottle_id, ttl, now);
        let encoded = serde_json::to_vec(&lease.record()).map_err(|e| StorageError::Corrupt {
            id: bottle_id.to_string(),
            reason: format!("Failed to serialize lease: {}", e),
        })?;

        loop {
            let current = self.leases.get(key)?;
            if let Some(bytes) = &current {
                // An unreadable record is treated as expired and overwritten
                if let Ok(record) = serde_json::from_slice::<LeaseRecord>(bytes) {
                    if record.is_live(now) {
                        return Ok(None);
                    }
                }
            }

            match self
                .leases
                .compare_and_swap(key, current, Some(encoded.clone()))?
            {
                Ok(()) => return Ok(Some(lease)),
                // Another writer got in between the read and the swap
                Err(_) => continue,
            }
        }
    }

    fn release(&self, lease: &Lease) -> Result<(), StorageError> {
        let key = lease.bottle_id.as_bytes();
        let Some(current) = self.leases.get(key)? else {
            return Ok(());
        };
        let ours = serde_json::from_slice::<LeaseRecord>(&current)
            .map(|record| record.token == lease.token)
            .unwrap_or(false);
        if ours {
            // Losing this swap means someone re-acquired after expiry
            let _ = self
                .leases
                .compare_and_swap(key, Some(current), None::<Vec<u8>>)?;
        }
        Ok(())
    }
}
