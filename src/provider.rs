//! Geo Provider Abstraction
//!
//! The itinerary core needs two things from the outside world: a nearby
//! point-of-interest search and a path between two points. Both are expressed
//! as async traits so the engine stays provider-agnostic; `AzureMapsClient`
//! implements them against the Azure Maps REST API.

use crate::error::ProviderError;
use crate::types::{Point, RouteSegment};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub mod azure_maps;

pub use azure_maps::AzureMapsClient;

/// Nearby point-of-interest search
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Return up to `limit` points within `radius_m` meters of `center`,
    /// nearest first.
    async fn search_nearby(
        &self,
        center: Point,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<Point>, ProviderError>;

    fn provider_name(&self) -> &str;
}

/// Point-to-point routing
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Route from `start` to `end`. The returned path is the provider's
    /// geometry for the leg, in travel order.
    async fn route(&self, start: Point, end: Point) -> Result<RouteSegment, ProviderError>;

    fn provider_name(&self) -> &str;
}

// Helper function to map HTTP errors to ProviderError
pub(crate) fn map_http_error(error: reqwest::Error) -> ProviderError {
    if let Some(status) = error.status() {
        map_status(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        ProviderError::Timeout(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ProviderError::RequestFailed(format!("Connection error: {}", error))
    } else {
        ProviderError::RequestFailed(format!("HTTP error: {}", error))
    }
}

pub(crate) fn map_status(status: u16, detail: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthFailed(format!("Authentication failed: {}", detail)),
        429 => ProviderError::RateLimit(format!("Rate limit exceeded: {}", detail)),
        _ => ProviderError::RequestFailed(format!(
            "Request failed with status {}: {}",
            status, detail
        )),
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn build_provider_http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))
}
