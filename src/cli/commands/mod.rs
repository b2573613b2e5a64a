//! CLI commands implementation.

mod check;
mod monitor;
mod process;
mod status;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use scanflow::config::{load_settings, LoadOptions, Settings};
use scanflow::logging;

#[derive(Parser)]
#[command(name = "scanflow")]
#[command(about = "Batch OCR for scanned PDF documents")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: scanflow.{toml,yaml,json} in the working or config directory)
    #[arg(short, long, global = true, env = "SCANFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the default layout lives under
    #[arg(long, global = true, env = "SCANFLOW_BASE_DIR")]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every pending document once, then exit
    Process,

    /// Watch the pending directory and process documents as they arrive
    Monitor {
        /// Seconds to wait between checks (overrides configuration)
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },

    /// Check which external tools are installed
    Check {
        /// Print the probe result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show pending, archived and output document counts
    Status,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let options = LoadOptions {
        config_path: cli.config.clone(),
        base_dir: cli.base_dir.clone(),
    };
    let mut settings = load_settings(&options)
        .await
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Process => {
            prepare_run(&settings, cli.verbose)?;
            process::cmd_process(&settings).await
        }
        Commands::Monitor { interval } => {
            if let Some(secs) = interval {
                settings.poll_interval_secs = secs;
            }
            prepare_run(&settings, cli.verbose)?;
            monitor::cmd_monitor(&settings).await
        }
        Commands::Check { json } => {
            logging::init(cli.verbose, None);
            check::cmd_check(&settings, json)
        }
        Commands::Status => {
            logging::init(cli.verbose, None);
            status::cmd_status(&settings)
        }
    }
}

/// Create the working directories and start file logging.
fn prepare_run(settings: &Settings, verbose: bool) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    logging::init(verbose, Some(&settings.log_file));
    if let Some(ref path) = settings.config_path {
        tracing::debug!("Using config {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_monitor_interval() {
        let cli = Cli::try_parse_from(["scanflow", "monitor", "--interval", "5", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Monitor { interval: Some(5) }));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Cli::try_parse_from(["scanflow", "monitor", "--interval", "0"]).is_err());
    }

    #[test]
    fn test_parse_check_json() {
        let cli = Cli::try_parse_from(["scanflow", "check", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { json: true }));
        let cli = Cli::try_parse_from(["scanflow", "check"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { json: false }));
    }

    #[test]
    fn test_unknown_subcommand_is_usage_error() {
        let err = Cli::try_parse_from(["scanflow", "frobnicate"]).err().unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_help_exits_zero() {
        let err = Cli::try_parse_from(["scanflow", "help"]).err().unwrap();
        assert_eq!(err.exit_code(), 0);
    }
}
