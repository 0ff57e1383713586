//! Geo helpers used by the itinerary engine: jitter, waypoint picking and
//! path building.

pub mod jitter;
pub mod path;
pub mod waypoint;

pub use jitter::{jitter_offset, FixedJitter, Jitter, RandomJitter, SeededJitter};
pub use path::PathBuilder;
pub use waypoint::WaypointPicker;

use std::time::Duration;

/// Per-call bound on provider requests
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Radius, in meters, searched around the jittered center
pub const DEFAULT_SEARCH_RADIUS_M: f64 = 500.0;
