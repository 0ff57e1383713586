//! CLI help: command names used in log fields.

use crate::cli::parse::Commands;

/// Command name string for log lines (e.g. "serve", "launch").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Serve => "serve",
        Commands::Launch { .. } => "launch",
        Commands::Cancel { .. } => "cancel",
        Commands::Show { .. } => "show",
    }
}
