//! CLI help and command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Command name string used in log events (e.g. "delete.products").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Counts { .. } => "counts".to_string(),
        Commands::Delete { record_type, .. } => format!("delete.{}", record_type.plural()),
        Commands::Seed { .. } => "seed".to_string(),
        Commands::Serve { .. } => "serve".to_string(),
        Commands::Audit { .. } => "audit".to_string(),
    }
}

/// Whether the command removes data.
pub fn is_destructive(command: &Commands) -> bool {
    matches!(command, Commands::Delete { .. })
}
