//! Delayed retrigger queue
//!
//! Messages become visible at a scheduled time. `LocalDelayedQueue` is the
//! in-process implementation: producers hand messages to a channel, and the
//! single consumer (`DueMessages`) keeps them in a min-heap keyed by
//! visibility time and yields each one when it falls due.

use crate::error::DriftError;
use crate::types::Journey;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

/// A message body and the time it becomes visible to the consumer
#[derive(Debug, Clone, PartialEq)]
pub struct DelayedMessage {
    pub body: String,
    pub visible_at: DateTime<Utc>,
}

impl DelayedMessage {
    /// Serialize `journey` as the body, visible `delay` from now.
    pub fn for_journey(journey: &Journey, delay: Duration) -> Result<Self, DriftError> {
        let body = serde_json::to_string(journey)
            .map_err(|e| DriftError::ScheduleFailure(format!("Failed to serialize journey: {}", e)))?;
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
        let visible_at = Utc::now()
            .checked_add_signed(delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Ok(Self { body, visible_at })
    }
}

/// Delayed message submission
#[async_trait]
pub trait DelayedQueue: Send + Sync {
    async fn schedule(&self, message: DelayedMessage) -> Result<(), DriftError>;

    fn queue_name(&self) -> &str;
}

struct Pending {
    due: Instant,
    seq: u64,
    message: DelayedMessage,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl Ord for Pending {
    /// Earlier due time first; submission order breaks ties
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Producer half of the in-process queue
pub struct LocalDelayedQueue {
    name: String,
    sender: mpsc::UnboundedSender<Pending>,
    next_seq: AtomicU64,
}

impl LocalDelayedQueue {
    pub fn new(name: impl Into<String>) -> (Self, DueMessages) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue = Self {
            name: name.into(),
            sender,
            next_seq: AtomicU64::new(0),
        };
        let due = DueMessages {
            receiver,
            pending: BinaryHeap::new(),
            closed: false,
        };
        (queue, due)
    }
}

#[async_trait]
impl DelayedQueue for LocalDelayedQueue {
    async fn schedule(&self, message: DelayedMessage) -> Result<(), DriftError> {
        let wait = (message.visible_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let due = Instant::now()
            .checked_add(wait)
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(u32::MAX as u64));
        let pending = Pending {
            due,
            seq: self.next_seq.fetch_add(1, AtomicOrdering::Relaxed),
            message,
        };

        self.sender.send(pending).map_err(|_| {
            DriftError::ScheduleFailure(format!("queue {} is no longer consumed", self.name))
        })?;
        debug!(queue = %self.name, wait_ms = wait.as_millis() as u64, "Scheduled delayed message");
        Ok(())
    }

    fn queue_name(&self) -> &str {
        &self.name
    }
}

/// Consumer half: yields messages once they are visible
pub struct DueMessages {
    receiver: mpsc::UnboundedReceiver<Pending>,
    pending: BinaryHeap<Reverse<Pending>>,
    closed: bool,
}

impl DueMessages {
    /// Messages received but not yet due
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Wait for the next visible message.
    ///
    /// Returns `None` once every producer is gone and nothing is left
    /// pending.
    pub async fn next(&mut self) -> Option<DelayedMessage> {
        loop {
            let next_due = self.pending.peek().map(|Reverse(p)| p.due);
            match next_due {
                Some(due) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(due) => {
                            return self.pending.pop().map(|Reverse(p)| p.message);
                        }
                        received = self.receiver.recv(), if !self.closed => match received {
                            Some(p) => self.pending.push(Reverse(p)),
                            None => self.closed = true,
                        },
                    }
                }
                None => match self.receiver.recv().await {
                    Some(p) => self.pending.push(Reverse(p)),
                    None => return None,
                },
            }
        }
    }
}
