//! CLI domain: parse, route, help, output, and presentation only.
//! Commands either run the service in-process (`serve`) or talk to a
//! running server over HTTP.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{format_journey_text, format_response_body};
pub use route::RunContext;
