use clap::Parser;
use colored::Colorize;
use layerfix_core::cli::{self, Cli};
use layerfix_core::exit::LayerfixExit;
use tracing_subscriber::EnvFilter;

fn main() -> LayerfixExit {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = if let Some(cmd) = cli.command {
        cli::dispatch::execute(cmd)
    } else {
        use clap::CommandFactory;
        let _ = Cli::command().print_help();
        Ok(LayerfixExit::Success)
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red());
            LayerfixExit::Error
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("layerfix_core=debug,layerfix=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
