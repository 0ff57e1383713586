//! Property-based tests for journey growth

use super::support::{engine, launched, StubRouting, StubSearch, ORIGIN};
use driftbottle::geo::SeededJitter;
use driftbottle::itinerary::delay_for_distance;
use driftbottle::types::{Point, RouteSegment};
use proptest::prelude::*;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_growth_and_endpoint_invariants(
        existing in 0usize..6,
        seed in any::<u64>(),
        distances in proptest::collection::vec(0.0f64..50_000.0, 6),
    ) {
        let mut journey = launched("bottle-p");
        let mut at = ORIGIN;
        for (i, distance) in distances.iter().take(existing).enumerate() {
            let next = Point::new(at.lon + 0.001 * (i as f64 + 1.0), at.lat);
            journey = journey.with_appended(vec![RouteSegment::new(*distance, vec![at, next])], next);
            at = next;
        }

        let extension = runtime().block_on(
            engine(
                Arc::new(StubSearch::echo()),
                Arc::new(StubRouting::new(321.0)),
                Arc::new(SeededJitter::new(seed)),
            )
            .extend(&journey),
        ).unwrap();
        let updated = extension.journey;

        let expected = if existing == 0 { 2 } else { existing + 1 };
        prop_assert_eq!(updated.segments().len(), expected);
        prop_assert_eq!(updated.origin(), ORIGIN);
        prop_assert_eq!(updated.created_at(), journey.created_at());
        prop_assert_eq!(&updated.segments()[..existing], journey.segments());
        prop_assert_eq!(Some(updated.endpoint()), updated.segments().last().and_then(|s| s.end()));

        // every new waypoint stays within the jitter box around the origin
        for segment in &updated.segments()[existing..] {
            let end = segment.end().unwrap();
            prop_assert!((end.lon - ORIGIN.lon).abs() < 0.01 + 1e-9);
            prop_assert!((end.lat - ORIGIN.lat).abs() < 0.01 + 1e-9);
        }

        let basis = if existing == 0 { 321.0 } else { distances[existing - 1] };
        prop_assert_eq!(extension.delay, delay_for_distance(basis));
    }
}
