//! CLI output: user-facing error text.

use crate::error::DriftError;

/// Map service errors to a string for CLI output.
pub fn map_error(e: &DriftError) -> String {
    match e {
        DriftError::Config(msg) => format!("Configuration error: {}\nSee config/config.toml or set MAPS_SUB_KEY.", msg),
        other => other.to_string(),
    }
}
