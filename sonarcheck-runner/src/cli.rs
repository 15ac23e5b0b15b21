//! CLI argument parsing using clap derive API.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// sonarcheck -- integration checks for the scanner image against a
/// quality server.
#[derive(Parser, Debug)]
#[command(name = "sonarcheck", version, about, long_about = None)]
pub struct Cli {
    /// Path to a sonarcheck.toml file (defaults plus environment when omitted).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Docker daemon socket (defaults to `DOCKER_HOST` or the platform socket).
    #[arg(long, global = true)]
    pub docker_socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start (or attach to) the server and run the scenario catalogue.
    Run(RunArgs),

    /// Wait until the server container reports it is up.
    WaitReady(WaitReadyArgs),

    /// Validate the configuration and, optionally, a scenario file.
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario catalogue (TOML).
    #[arg(short, long, default_value = "scenarios/cnes.toml")]
    pub scenarios: PathBuf,

    /// Run only the scenario with this name.
    #[arg(long)]
    pub only: Option<String>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct WaitReadyArgs {
    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Scenario catalogue to check as well.
    #[arg(short, long)]
    pub scenarios: Option<PathBuf>,
}
