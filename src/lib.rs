//! driftbottle: self-rescheduling message-in-a-bottle itineraries
//!
//! Each bottle owns a persisted journey that drifts between randomly chosen
//! nearby waypoints. The route function extends a journey by one or two
//! segments, persists and broadcasts it, then queues itself to run again
//! after a delay proportional to the distance traveled.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod geo;
pub mod guard;
pub mod itinerary;
pub mod logging;
pub mod provider;
pub mod reschedule;
pub mod retrigger;
pub mod route_function;
pub mod schedule;
pub mod server;
pub mod store;
pub mod types;
