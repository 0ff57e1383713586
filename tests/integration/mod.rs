//! Integration tests for the driftbottle itinerary service

mod support;

mod itinerary_properties;
mod route_function_flow;
