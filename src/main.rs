use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use relink::cli::commands;
use relink::cli::{Cli, Commands, RunOptions};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = RunOptions {
        root: cli
            .root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))),
        config: cli.config.clone(),
        dry_run: cli.dry_run,
        verbose: cli.verbose,
        include: cli.include.clone(),
        exclude: cli.exclude.clone(),
    };

    let (output, report) = match cli.command {
        Commands::Move { ref from, ref to } => commands::run_move(&options, from, to, cli.format)?,
        Commands::Batch { ref file } => commands::run_batch(&options, file, cli.format)?,
    };
    println!("{}", output);

    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}

/// Log to stderr so stdout stays parseable. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "relink=debug" } else { "relink=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
