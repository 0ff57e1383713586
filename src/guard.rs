//! Existence Guard
//!
//! A bottle that has been deleted from the store must stop drifting. Before
//! any extension the guard looks the id up; a store outage is reported as its
//! own outcome so a live journey is never mistaken for a deleted one.

use crate::store::JourneyStore;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Found,
    NotFound,
    /// The store could not answer; retryable
    Unavailable(String),
}

impl Presence {
    pub fn is_found(&self) -> bool {
        matches!(self, Presence::Found)
    }
}

pub fn check_presence(store: &dyn JourneyStore, id: &str) -> Presence {
    match store.contains(id) {
        Ok(true) => Presence::Found,
        Ok(false) => {
            debug!(bottle_id = %id, "Journey not found in store");
            Presence::NotFound
        }
        Err(e) => {
            warn!(bottle_id = %id, error = %e, "Existence check failed");
            Presence::Unavailable(e.to_string())
        }
    }
}
