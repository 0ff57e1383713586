//! Rescheduler
//!
//! After a successful extension: persist the new snapshot, tell live
//! subscribers, and queue the next invocation. Steps run in that order and
//! stop at the first failure. A scheduling failure after the write leaves
//! the journey advanced with nothing queued to move it again.
//!
//! The write only replaces a journey that is still stored. A bottle deleted
//! while its extension was running stays deleted, and nothing is published
//! or queued for it.

use crate::error::DriftError;
use crate::schedule::{BroadcastMessage, Broadcaster, DelayedMessage, DelayedQueue};
use crate::store::JourneyStore;
use crate::types::Journey;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// What the rescheduler did with an extended journey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rescheduled {
    /// Persisted, published and queued
    Scheduled,
    /// The bottle was removed before the write; nothing happened
    Cancelled,
}

pub struct Rescheduler {
    store: Arc<dyn JourneyStore>,
    broadcaster: Arc<dyn Broadcaster>,
    queue: Arc<dyn DelayedQueue>,
}

impl Rescheduler {
    pub fn new(
        store: Arc<dyn JourneyStore>,
        broadcaster: Arc<dyn Broadcaster>,
        queue: Arc<dyn DelayedQueue>,
    ) -> Self {
        Self {
            store,
            broadcaster,
            queue,
        }
    }

    pub async fn reschedule(
        &self,
        journey: &Journey,
        delay: Duration,
    ) -> Result<Rescheduled, DriftError> {
        let written = self
            .store
            .update_existing(journey)
            .map_err(|e| DriftError::StoreUnavailable(e.to_string()))?;
        if !written {
            info!(bottle_id = %journey.id(), "Bottle removed during extension; not rescheduling");
            return Ok(Rescheduled::Cancelled);
        }

        let receivers = self
            .broadcaster
            .publish(&BroadcastMessage::send_to_all(journey)?)?;
        debug!(bottle_id = %journey.id(), receivers, "Broadcast journey update");

        let message = DelayedMessage::for_journey(journey, delay)?;
        let visible_at = message.visible_at;
        if let Err(e) = self.queue.schedule(message).await {
            error!(
                bottle_id = %journey.id(),
                queue = %self.queue.queue_name(),
                error = %e,
                "Journey persisted but no retrigger was scheduled; it will not drift again"
            );
            return Err(e);
        }

        info!(
            bottle_id = %journey.id(),
            segments = journey.segments().len(),
            visible_at = %visible_at.to_rfc3339(),
            "Scheduled next extension"
        );
        Ok(Rescheduled::Scheduled)
    }
}
