//! CLI parse: clap types for driftbottle. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// driftbottle - drifting message-in-a-bottle itineraries
#[derive(Parser)]
#[command(name = "driftbottle")]
#[command(about = "Self-rescheduling message-in-a-bottle itinerary service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the HTTP adapter, the retrigger queue and its dispatcher
    Serve,
    /// Launch a new bottle at a coordinate
    Launch {
        /// Longitude of the launch point
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Latitude of the launch point
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Server base URL (defaults to the configured bind address)
        #[arg(long)]
        server: Option<String>,
    },
    /// Cancel a bottle; its next scheduled extension ends the journey
    Cancel {
        /// Bottle id
        id: String,
        /// Server base URL (defaults to the configured bind address)
        #[arg(long)]
        server: Option<String>,
    },
    /// Show a bottle's journey
    Show {
        /// Bottle id
        id: String,
        /// Server base URL (defaults to the configured bind address)
        #[arg(long)]
        server: Option<String>,
        /// Print the raw journey document
        #[arg(long)]
        json: bool,
    },
}
