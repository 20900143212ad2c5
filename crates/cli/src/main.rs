//! backsnap CLI - automatic indexed file backups

use backsnap_core::Config;
use backsnap_watcher::LoopOptions;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

mod daemon;
mod logging;

use daemon::Daemon;

const LONG_ABOUT: &str = "\
CLI tool for automatic file backups.
Watches specified input paths, detects changes,
and copies files to the specified output paths.

Input and output paths are specified via a JSON
configuration file. By default it's \"backup.json\"
in the current directory. You may specify another
path.

The tool also watches its configuration file and
restarts on any changes to it.";

const EXAMPLE: &str = r#"Example "backup.json":

  {
    "limit": 32,
    "debounce": "1s",
    "deadline": "10s",
    "throttle": "10m",
    "entries": [
      {
        "input": "<file_or_directory_path>",
        "output": "<directory_path>"
      }
    ]
  }

Durations are milliseconds or strings like "250ms", "1m30s".
A limit of 0 or less keeps every backup."#;

/// backsnap - watch paths and keep indexed backup copies
#[derive(Parser, Debug)]
#[command(name = "backsnap")]
#[command(author, version, about, long_about = LONG_ABOUT, after_help = EXAMPLE)]
struct Cli {
    /// Config file
    #[arg(short, long, value_name = "FILE", default_value = "backup.json")]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// `help` prints this message; nothing else is accepted
    #[arg(hide = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    if let Some(first) = cli.args.first() {
        if first == "help" {
            let _ = Cli::command().print_long_help();
            return ExitCode::SUCCESS;
        }
        eprintln!("{} unexpected arguments: {:?}", "error:".red(), cli.args);
        return ExitCode::FAILURE;
    }

    if cli.config.as_os_str().is_empty() {
        eprintln!("{} missing path to config file", "error:".red());
        return ExitCode::FAILURE;
    }

    if !cli.config.is_file() {
        eprintln!("{} missing config file {:?}", "error:".red(), cli.config);
        return ExitCode::FAILURE;
    }

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(cli.verbose);

    let options = LoopOptions {
        verbose: cli.verbose,
    };
    Daemon::new(cli.config, options)
        .run(config, shutdown_signal())
        .await;

    ExitCode::SUCCESS
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("unable to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
