//! Command dispatch logic extracted from the binary.

use super::args::Commands;
use super::handlers::{handle_analyze, handle_fix, handle_layers};
use crate::exit::LayerfixExit;
use anyhow::Result;

/// Executes the parsed command.
///
/// # Errors
/// Returns error if the command handler fails.
pub fn execute(command: Commands) -> Result<LayerfixExit> {
    match command {
        Commands::Fix(args) => handle_fix(&args),
        Commands::Analyze { paths, format } => handle_analyze(&paths, format),
        Commands::Layers { format } => handle_layers(format),
    }
}
