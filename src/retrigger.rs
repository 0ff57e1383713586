//! Retrigger Dispatcher
//!
//! Consumes due messages from the delayed queue and posts each body back to
//! the route function. Forwarding is fire-and-forget: the consumer moves on
//! to the next message without waiting for the extension to finish, and a
//! failed forward is only logged.
//!
//! On shutdown, messages that are not yet due are left behind. They are
//! rebuilt from the journey store on the next start.

use crate::error::DriftError;
use crate::schedule::DueMessages;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub struct RetriggerDispatcher {
    client: Client,
    target_url: String,
}

impl RetriggerDispatcher {
    pub fn new(target_url: impl Into<String>, timeout: Duration) -> Result<Self, DriftError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DriftError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            target_url: target_url.into(),
        })
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Forward one message body.
    ///
    /// Returns the handle of the spawned forward, or `None` when the body
    /// is not a journey and was dropped.
    pub fn dispatch(&self, body: String) -> Option<JoinHandle<()>> {
        let bottle_id = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| value.get("id").and_then(Value::as_str).map(str::to_string));
        let Some(bottle_id) = bottle_id else {
            error!(bytes = body.len(), "Dropping retrigger message without a bottle id");
            return None;
        };

        info!(bottle_id = %bottle_id, "Retriggering route function for bottle id {}.", bottle_id);
        let request = self
            .client
            .post(&self.target_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        Some(tokio::spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(bottle_id = %bottle_id, status = response.status().as_u16(), "Retrigger delivered");
                }
                Ok(response) => {
                    warn!(
                        bottle_id = %bottle_id,
                        status = response.status().as_u16(),
                        "Route function rejected retrigger; journey may be stalled"
                    );
                }
                Err(e) => {
                    warn!(
                        bottle_id = %bottle_id,
                        error = %e,
                        "Retrigger could not reach route function; journey may be stalled"
                    );
                }
            }
        }))
    }

    /// Forward due messages until `shutdown` resolves or the queue is
    /// closed and drained, whichever comes first.
    pub async fn run<F>(&self, mut due: DueMessages, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(target_url = %self.target_url, "Retrigger dispatcher started");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(pending = due.pending(), "Shutdown requested; dispatcher stopping");
                    return;
                }
                next = due.next() => match next {
                    Some(message) => {
                        let _ = self.dispatch(message.body);
                    }
                    None => break,
                },
            }
        }
        info!("Retrigger queue closed; dispatcher stopping");
    }
}
