//! Path building between two waypoints.

use super::DEFAULT_PROVIDER_TIMEOUT;
use crate::error::DriftError;
use crate::provider::RoutingProvider;
use crate::types::{Point, RouteSegment};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct PathBuilder {
    routing: Arc<dyn RoutingProvider>,
    timeout: Duration,
}

impl PathBuilder {
    pub fn new(routing: Arc<dyn RoutingProvider>) -> Self {
        Self {
            routing,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the segment from `start` to `end`.
    ///
    /// The returned path always begins at `start` and ends at `end`; the
    /// provider geometry is kept in between.
    pub async fn build(&self, start: Point, end: Point) -> Result<RouteSegment, DriftError> {
        let segment = tokio::time::timeout(self.timeout, self.routing.route(start, end))
            .await
            .map_err(|_| {
                DriftError::RouteUnavailable(format!(
                    "{} routing timed out after {}s",
                    self.routing.provider_name(),
                    self.timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| DriftError::RouteUnavailable(e.to_string()))?;

        if !segment.distance_meters.is_finite() || segment.distance_meters < 0.0 {
            return Err(DriftError::RouteUnavailable(format!(
                "invalid route length {}",
                segment.distance_meters
            )));
        }
        if segment.path.is_empty() {
            return Err(DriftError::RouteUnavailable(
                "route geometry is empty".to_string(),
            ));
        }

        let RouteSegment {
            distance_meters,
            mut path,
        } = segment;
        if path.first() != Some(&start) {
            path.insert(0, start);
        }
        if path.last() != Some(&end) {
            path.push(end);
        }

        debug!(distance_m = distance_meters, points = path.len(), "Built path");
        Ok(RouteSegment::new(distance_meters, path))
    }
}
