use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub mod commands;
pub mod output;

#[derive(Parser)]
#[command(
    name = "relink",
    version,
    about = "Move files in a TypeScript/JavaScript monorepo and rewrite every import that points at them"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root (default: current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Path to config file (default: .relink/config.toml or relink.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Compute and report changes without touching any file
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Report every rewritten reference and log decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Scan only files matching this glob
    #[arg(long, global = true)]
    pub include: Vec<String>,

    /// Do not scan files matching this glob
    #[arg(long, global = true)]
    pub exclude: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Move one file or directory
    Move {
        /// Current path (relative to the project root)
        from: PathBuf,
        /// New path (relative to the project root)
        to: PathBuf,
    },

    /// Apply a batch of moves from a JSON file: [{"from": "...", "to": "..."}]
    Batch {
        /// Batch file, or `-` for stdin
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Compact,
}

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub root: PathBuf,
    pub config: Option<PathBuf>,
    pub dry_run: bool,
    pub verbose: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}
