use crate::layers::LayerId;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "layerfix",
    version,
    about = "Layered, validated fixes for JavaScript and TypeScript projects"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    /// Debug logging (overrides `RUST_LOG`)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run fix layers over files
    Fix(FixArgs),
    /// Report detected issues and the layers that would fix them
    Analyze {
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List the available layers
    Layers {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Args, Debug, Clone, Default)]
pub struct FixArgs {
    /// Files or directories (default: current directory)
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,
    /// Comma-separated layer ids; dependencies are added automatically
    #[arg(long, value_delimiter = ',', conflicts_with = "all")]
    pub layers: Vec<LayerId>,
    /// Run every layer
    #[arg(long)]
    pub all: bool,
    /// Compute results without writing files or backups
    #[arg(long)]
    pub dry_run: bool,
    /// Stop a file's pipeline at the first failing layer
    #[arg(long)]
    pub fail_fast: bool,
    /// Use textual strategies only
    #[arg(long)]
    pub no_ast: bool,
    /// Disable the skip cache
    #[arg(long)]
    pub no_cache: bool,
    /// Do not back up files before overwriting them
    #[arg(long)]
    pub no_backup: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
