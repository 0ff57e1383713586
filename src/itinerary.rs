//! Itinerary Extension Engine
//!
//! Grows a journey by one step. An empty journey is bootstrapped with two
//! legs radiating from the origin; a journey that has already traveled gains
//! one leg from its current endpoint to a fresh waypoint picked near the
//! original origin. The engine also decides how long to wait before the next
//! extension.
//!
//! The engine never persists anything: it returns a new snapshot and leaves
//! the input untouched, so a failure anywhere means nothing was appended.

use crate::error::DriftError;
use crate::geo::{PathBuilder, WaypointPicker};
use crate::types::Journey;
use std::time::Duration;
use tracing::info;

/// Which state transition applies to a journey snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No legs yet: build two
    Bootstrap,
    /// At least one leg: append one
    Extend,
}

impl Transition {
    pub fn for_journey(journey: &Journey) -> Self {
        if journey.segments().is_empty() {
            Transition::Bootstrap
        } else {
            Transition::Extend
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Bootstrap => "bootstrap",
            Transition::Extend => "extend",
        }
    }
}

/// Result of one successful extension
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub journey: Journey,
    pub delay: Duration,
}

impl Extension {
    pub fn delay_ms(&self) -> u128 {
        self.delay.as_millis()
    }
}

/// Re-invocation delay for a leg: the distance in meters read as a count of
/// milliseconds, times 1000.
///
/// Not a travel-time estimate; only spaces out retriggers.
pub fn delay_for_distance(distance_meters: f64) -> Duration {
    if distance_meters.is_nan() || distance_meters <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(distance_meters).unwrap_or(Duration::MAX)
}

/// The delay the latest extension of `journey` scheduled, following the
/// same leg choice as the engine: the first leg after a bootstrap, the
/// previous last leg after an extend. Zero for a journey never extended.
pub fn scheduled_delay(journey: &Journey) -> Duration {
    let segments = journey.segments();
    let basis = match segments.len() {
        0 => return Duration::ZERO,
        1 => &segments[0],
        n => &segments[n - 2],
    };
    delay_for_distance(basis.distance_meters)
}

pub struct ItineraryEngine {
    picker: WaypointPicker,
    builder: PathBuilder,
}

impl ItineraryEngine {
    pub fn new(picker: WaypointPicker, builder: PathBuilder) -> Self {
        Self { picker, builder }
    }

    /// Apply the transition selected by the snapshot's segment count.
    pub async fn extend(&self, journey: &Journey) -> Result<Extension, DriftError> {
        let transition = Transition::for_journey(journey);
        let extension = match transition {
            Transition::Bootstrap => self.bootstrap(journey).await?,
            Transition::Extend => self.extend_one(journey).await?,
        };

        info!(
            bottle_id = %journey.id(),
            transition = transition.as_str(),
            segments = extension.journey.segments().len(),
            delay_ms = extension.delay_ms() as u64,
            "Extended journey"
        );
        Ok(extension)
    }

    async fn bootstrap(&self, journey: &Journey) -> Result<Extension, DriftError> {
        let origin = journey.origin();

        // Both waypoints are centered on the origin, so they can be picked
        // together; the two legs only need both waypoints.
        let (first, second) =
            futures::try_join!(self.picker.pick(origin), self.picker.pick(origin))?;
        let (first_leg, second_leg) = futures::try_join!(
            self.builder.build(origin, first),
            self.builder.build(first, second)
        )?;

        let delay = delay_for_distance(first_leg.distance_meters);
        Ok(Extension {
            journey: journey.with_appended(vec![first_leg, second_leg], second),
            delay,
        })
    }

    async fn extend_one(&self, journey: &Journey) -> Result<Extension, DriftError> {
        // The delay follows the leg that was already last before this call
        let previous_distance = journey
            .last_segment()
            .map(|segment| segment.distance_meters)
            .unwrap_or_default();

        let waypoint = self.picker.pick(journey.origin()).await?;
        let leg = self.builder.build(journey.endpoint(), waypoint).await?;

        Ok(Extension {
            journey: journey.with_appended(vec![leg], waypoint),
            delay: delay_for_distance(previous_distance),
        })
    }
}
