use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "qmemman")]
#[command(about = "Plan memory targets for running domains from a usage snapshot")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json)
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Config file (defaults to ~/.config/qmemman/qmemman.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Redistribute free host memory across live domains
    Balance {
        /// Snapshot TOML with xen_free_memory and [[domains]]
        snapshot: PathBuf,
    },

    /// Free a fixed number of bytes from donor domains
    Balloon {
        /// Snapshot TOML with xen_free_memory and [[domains]]
        snapshot: PathBuf,

        /// Bytes that must be freed
        #[arg(long)]
        bytes: i64,
    },

    /// Parse and validate a single meminfo report ("-" reads stdin)
    CheckMeminfo {
        /// Raw meminfo file
        path: PathBuf,
    },
}

/// Output format for CLI responses
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
