use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod format;

use commands::check::{CheckArgs, MultipleChoiceArgs, RecognizedArgs};
use commands::check_json::CheckJsonArgs;
use commands::config::ConfigAction;
use config::CheckConfig;

/// Decide whether a student's math answer matches the reference answer.
#[derive(Parser, Debug)]
#[command(name = "eqv", version, about)]
struct Cli {
    /// Config file (defaults to ./eqv_config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log every strategy decision to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare a short answer with the reference
    Check(CheckArgs),
    /// Compare a selected option index with the correct one
    Mc(MultipleChoiceArgs),
    /// Answer a JSON request document (argument or stdin)
    CheckJson(CheckJsonArgs),
    /// Check text produced by a handwriting recognizer
    Recognized(RecognizedArgs),
    /// Show, save or restore the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let path = CheckConfig::resolve_path(cli.config.as_deref());
    let config = CheckConfig::load(&path);
    let options = &config.engine;

    match cli.command {
        Command::Check(args) => commands::check::run(args, options),
        Command::Mc(args) => commands::check::run_multiple_choice(args, options),
        Command::CheckJson(args) => commands::check_json::run(args, options)?,
        Command::Recognized(args) => commands::check::run_recognized(args, options),
        Command::Config { action } => commands::config::run(action, &config, &path)?,
    }
    Ok(())
}
