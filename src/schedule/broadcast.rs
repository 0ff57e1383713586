//! Broadcast channel for live journey updates.

use crate::error::DriftError;
use crate::types::Journey;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Envelope fanned out to every connected subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    pub action_name: String,
    /// Serialized journey
    pub data: String,
    pub data_type: String,
}

impl BroadcastMessage {
    pub fn send_to_all(journey: &Journey) -> Result<Self, DriftError> {
        let data = serde_json::to_string(journey).map_err(|e| {
            DriftError::BroadcastFailure(format!("Failed to serialize journey: {}", e))
        })?;
        Ok(Self {
            action_name: "sendToAll".to_string(),
            data,
            data_type: "json".to_string(),
        })
    }
}

pub trait Broadcaster: Send + Sync {
    /// Publish to current subscribers; returns how many received it.
    /// Having no subscribers is not an error.
    fn publish(&self, message: &BroadcastMessage) -> Result<usize, DriftError>;
}

/// Broadcaster over a tokio broadcast channel
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<BroadcastMessage>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.sender.subscribe()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn publish(&self, message: &BroadcastMessage) -> Result<usize, DriftError> {
        // send only fails when nobody is subscribed
        Ok(self.sender.send(message.clone()).unwrap_or(0))
    }
}
