//! Waypoint picking: one nearby point of interest around a jittered center.

use super::{Jitter, DEFAULT_PROVIDER_TIMEOUT, DEFAULT_SEARCH_RADIUS_M};
use crate::error::DriftError;
use crate::provider::SearchProvider;
use crate::types::Point;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct WaypointPicker {
    search: Arc<dyn SearchProvider>,
    jitter: Arc<dyn Jitter>,
    radius_m: f64,
    timeout: Duration,
}

impl WaypointPicker {
    pub fn new(search: Arc<dyn SearchProvider>, jitter: Arc<dyn Jitter>) -> Self {
        Self {
            search,
            jitter,
            radius_m: DEFAULT_SEARCH_RADIUS_M,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = radius_m;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pick one waypoint near `origin`.
    ///
    /// Fails with `WaypointUnavailable` on timeout, provider error, or an
    /// empty result. Nothing is retried here.
    pub async fn pick(&self, origin: Point) -> Result<Point, DriftError> {
        let center = origin.offset(self.jitter.offset(), self.jitter.offset());

        let results = tokio::time::timeout(
            self.timeout,
            self.search.search_nearby(center, self.radius_m, 1),
        )
        .await
        .map_err(|_| {
            DriftError::WaypointUnavailable(format!(
                "{} search timed out after {}s",
                self.search.provider_name(),
                self.timeout.as_secs_f64()
            ))
        })?
        .map_err(|e| DriftError::WaypointUnavailable(e.to_string()))?;

        let waypoint = results.into_iter().next().ok_or_else(|| {
            DriftError::WaypointUnavailable(format!(
                "no point of interest within {} m of ({}, {})",
                self.radius_m, center.lon, center.lat
            ))
        })?;

        debug!(
            lon = waypoint.lon,
            lat = waypoint.lat,
            "Picked waypoint"
        );
        Ok(waypoint)
    }
}
