//! Journey Store
//!
//! Persisted journey documents keyed by bottle id, plus the short-lived
//! per-bottle leases that keep two invocations from extending the same
//! journey at once.

pub mod memory;
pub mod persistence;

pub use memory::MemoryJourneyStore;
pub use persistence::SledJourneyStore;

use crate::error::StorageError;
use crate::types::Journey;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Journey document store interface
pub trait JourneyStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Journey>, StorageError>;

    fn contains(&self, id: &str) -> Result<bool, StorageError>;

    /// Insert or replace the document stored under the journey's id
    fn upsert(&self, journey: &Journey) -> Result<(), StorageError>;

    /// Replace the stored document only while one is still present.
    ///
    /// Returns `false` without writing when the journey was removed in the
    /// meantime. The presence check and the write are one atomic step.
    fn update_existing(&self, journey: &Journey) -> Result<bool, StorageError>;

    /// Remove a journey. Returns whether a document was present.
    fn remove(&self, id: &str) -> Result<bool, StorageError>;

    /// Every stored journey id
    fn ids(&self) -> Result<Vec<String>, StorageError>;
}

/// Per-bottle lease interface
pub trait LeaseStore: Send + Sync {
    /// Take the lease for `bottle_id` unless an unexpired one is held.
    fn try_acquire(&self, bottle_id: &str, ttl: Duration) -> Result<Option<Lease>, StorageError>;

    /// Drop the lease if it is still ours. Releasing an expired or
    /// superseded lease is a no-op.
    fn release(&self, lease: &Lease) -> Result<(), StorageError>;
}

/// A granted lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub bottle_id: String,
    pub token: String,
    pub expires_at_ms: i64,
}

impl Lease {
    pub(crate) fn grant(bottle_id: &str, ttl: Duration, now_ms: i64) -> Self {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self {
            bottle_id: bottle_id.to_string(),
            token: uuid::Uuid::new_v4().to_string(),
            expires_at_ms: now_ms.saturating_add(ttl_ms),
        }
    }

    pub(crate) fn record(&self) -> LeaseRecord {
        LeaseRecord {
            token: self.token.clone(),
            expires_at_ms: self.expires_at_ms,
        }
    }
}

/// A granted lease, released when dropped, including when the owning
/// invocation is abandoned mid-flight.
pub struct LeaseGuard {
    leases: Arc<dyn LeaseStore>,
    lease: Lease,
}

impl LeaseGuard {
    pub fn new(leases: Arc<dyn LeaseStore>, lease: Lease) -> Self {
        Self { leases, lease }
    }

    pub fn lease(&self) -> &Lease {
        &self.lease
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Err(e) = self.leases.release(&self.lease) {
            // Left to expire after the TTL
            warn!(bottle_id = %self.lease.bottle_id, error = %e, "Failed to release lease");
        }
    }
}

/// Lease as persisted next to the journeys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LeaseRecord {
    pub token: String,
    pub expires_at_ms: i64,
}

impl LeaseRecord {
    pub fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at_ms > now_ms
    }
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn encode_journey(journey: &Journey) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(journey).map_err(|e| StorageError::Corrupt {
        id: journey.id().to_string(),
        reason: format!("Failed to serialize journey: {}", e),
    })
}

pub(crate) fn decode_journey(id: &str, bytes: &[u8]) -> Result<Journey, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Corrupt {
        id: id.to_string(),
        reason: format!("Failed to deserialize journey: {}", e),
    })
}
