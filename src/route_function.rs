//! Route Function
//!
//! The extension entry point. One invocation validates the request body,
//! confirms the bottle still exists, takes the bottle's lease, runs the
//! itinerary engine, and hands the result to the rescheduler. Every outcome
//! is mapped to a status code and a JSON body for the request adapter.

use crate::error::DriftError;
use crate::guard::{check_presence, Presence};
use crate::itinerary::{Extension, ItineraryEngine};
use crate::reschedule::{Rescheduled, Rescheduler};
use crate::store::{JourneyStore, LeaseGuard, LeaseStore};
use crate::types::Journey;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const MISSING_INPUTS: &str = "Missing required inputs to route function.";

const REQUIRED_FIELDS: [&str; 5] = ["id", "created", "origin", "endpoint", "routes"];

pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(60);

/// Status code and JSON body returned to the request adapter
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    pub status: u16,
    pub body: Value,
}

impl FunctionResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(err: &DriftError) -> Self {
        Self {
            status: err.status_code(),
            body: json!({ "error": err.to_string() }),
        }
    }

    fn terminated(bottle_id: &str) -> Self {
        Self::ok(json!({
            "message": format!("Bottle {} no longer exists; its journey has ended.", bottle_id)
        }))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What a successful invocation did
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Extended(Extension),
    /// The bottle was deleted, before or during the extension; nothing
    /// was appended or scheduled
    Terminated,
}

/// Validate a request body and read the journey snapshot out of it.
pub fn parse_request(body: &Value) -> Result<Journey, DriftError> {
    let object = body
        .as_object()
        .ok_or_else(|| DriftError::Validation(MISSING_INPUTS.to_string()))?;

    let missing = REQUIRED_FIELDS
        .iter()
        .any(|field| object.get(*field).map_or(true, Value::is_null));
    let empty_id = object
        .get("id")
        .and_then(Value::as_str)
        .map_or(false, str::is_empty);
    if missing || empty_id {
        return Err(DriftError::Validation(MISSING_INPUTS.to_string()));
    }

    serde_json::from_value(body.clone())
        .map_err(|e| DriftError::Validation(format!("Invalid route function input: {}", e)))
}

pub struct RouteFunction {
    engine: ItineraryEngine,
    journeys: Arc<dyn JourneyStore>,
    leases: Arc<dyn LeaseStore>,
    rescheduler: Rescheduler,
    lease_ttl: Duration,
}

impl RouteFunction {
    pub fn new(
        engine: ItineraryEngine,
        journeys: Arc<dyn JourneyStore>,
        leases: Arc<dyn LeaseStore>,
        rescheduler: Rescheduler,
    ) -> Self {
        Self {
            engine,
            journeys,
            leases,
            rescheduler,
            lease_ttl: DEFAULT_LEASE_TTL,
        }
    }

    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    /// Handle one request body end to end.
    pub async fn invoke(&self, body: &Value) -> FunctionResponse {
        let journey = match parse_request(body) {
            Ok(journey) => journey,
            Err(e) => {
                warn!(error = %e, "Rejected route function request");
                return FunctionResponse::error(&e);
            }
        };

        match self.run(&journey).await {
            Ok(Outcome::Extended(extension)) => FunctionResponse::ok(extension.journey.to_json()),
            Ok(Outcome::Terminated) => FunctionResponse::terminated(journey.id()),
            Err(e) => {
                warn!(bottle_id = %journey.id(), error = %e, "Route function failed");
                FunctionResponse::error(&e)
            }
        }
    }

    /// Guard, lease, extend, reschedule.
    pub async fn run(&self, journey: &Journey) -> Result<Outcome, DriftError> {
        let id = journey.id();
        info!(bottle_id = %id, segments = journey.segments().len(), "Route function invoked");

        match check_presence(self.journeys.as_ref(), id) {
            Presence::Found => {}
            Presence::NotFound => {
                info!(bottle_id = %id, "Bottle no longer exists; ending its journey");
                return Ok(Outcome::Terminated);
            }
            Presence::Unavailable(reason) => return Err(DriftError::StoreUnavailable(reason)),
        }

        let lease = self
            .leases
            .try_acquire(id, self.lease_ttl)
            .map_err(|e| DriftError::StoreUnavailable(e.to_string()))?
            .ok_or_else(|| DriftError::LeaseHeld(id.to_string()))?;
        let _lease = LeaseGuard::new(self.leases.clone(), lease);

        self.extend_and_reschedule(journey).await
    }

    async fn extend_and_reschedule(&self, journey: &Journey) -> Result<Outcome, DriftError> {
        let extension = self.engine.extend(journey).await?;
        match self
            .rescheduler
            .reschedule(&extension.journey, extension.delay)
            .await?
        {
            Rescheduled::Scheduled => Ok(Outcome::Extended(extension)),
            Rescheduled::Cancelled => Ok(Outcome::Terminated),
        }
    }
}
