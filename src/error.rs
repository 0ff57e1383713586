//! Error types for the driftbottle itinerary service.

use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt record for {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Errors raised by the search and routing providers
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    AuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Provider request timed out: {0}")]
    Timeout(String),

    #[error("Provider returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced by the itinerary core and its collaborators
#[derive(Debug, Error)]
pub enum DriftError {
    #[error("{0}")]
    Validation(String),

    #[error("Waypoint unavailable: {0}")]
    WaypointUnavailable(String),

    #[error("Route unavailable: {0}")]
    RouteUnavailable(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Failed to schedule retrigger: {0}")]
    ScheduleFailure(String),

    #[error("Failed to broadcast journey: {0}")]
    BroadcastFailure(String),

    #[error("Extension already in progress for bottle {0}")]
    LeaseHeld(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DriftError {
    /// HTTP status the request adapter reports for this error.
    ///
    /// Store outages map to 503 so callers can tell a transient failure apart
    /// from a journey that no longer exists.
    pub fn status_code(&self) -> u16 {
        match self {
            DriftError::Validation(_) => 400,
            DriftError::LeaseHeld(_) => 409,
            DriftError::StoreUnavailable(_) | DriftError::Storage(_) => 503,
            DriftError::WaypointUnavailable(_)
            | DriftError::RouteUnavailable(_)
            | DriftError::ScheduleFailure(_)
            | DriftError::BroadcastFailure(_)
            | DriftError::Config(_)
            | DriftError::Server(_) => 500,
        }
    }
}

impl From<config::ConfigError> for DriftError {
    fn from(err: config::ConfigError) -> Self {
        DriftError::Config(err.to_string())
    }
}
