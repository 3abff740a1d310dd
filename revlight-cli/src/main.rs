//! Revlight CLI - Command line interface for Revlight
//!
//! Sends code to the review backend and prints the feedback next to the
//! lines it refers to.

mod commands;
mod terminal;

use std::time::Duration;

use clap::{Parser, Subcommand};
use revlight_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{ReviewArgs, WatchArgs};

/// Revlight: code review feedback, highlighted in place
#[derive(Parser, Debug)]
#[command(name = "revlight")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Review backend URL (overrides config and env)
    #[arg(long, global = true, env = "REVLIGHT_BACKEND_URL")]
    backend_url: Option<String>,

    /// Delay between feedback polls, e.g. `2s` (overrides config and env)
    #[arg(long, global = true, env = "REVLIGHT_POLL_INTERVAL", value_parser = humantime::parse_duration)]
    poll_interval: Option<Duration>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Review a file once
    #[command(visible_alias = "r")]
    Review(ReviewArgs),

    /// Review a file every time it is saved
    #[command(visible_alias = "w")]
    Watch(WatchArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.backend_url.clone(), cli.poll_interval)?;

    if cli.verbose {
        tracing::info!(
            backend_url = %config.backend.url,
            poll_interval = ?config.poll.interval,
            max_attempts = ?config.poll.max_attempts,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("revlight {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Review(args)) => {
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::Watch(args)) => {
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::Config) => {
            println!("Revlight Configuration");
            println!("======================");
            println!();
            println!("Backend:");
            println!("  url: {}", config.backend.url);
            println!(
                "  request_timeout: {}",
                humantime::format_duration(config.backend.request_timeout)
            );
            println!();
            println!("Polling:");
            println!("  interval: {}", humantime::format_duration(config.poll.interval));
            println!("  backoff: {:?}", config.poll.backoff);
            println!(
                "  max_attempts: {}",
                config
                    .poll
                    .max_attempts
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "(unlimited)".to_string())
            );
            println!(
                "  max_wait: {}",
                config
                    .poll
                    .max_wait
                    .map(|d| humantime::format_duration(d).to_string())
                    .unwrap_or_else(|| "(none)".to_string())
            );
            println!();
            println!("Highlight colors:");
            println!("  high: {}", config.highlight.high);
            println!("  medium: {}", config.highlight.medium);
            println!("  low: {}", config.highlight.low);
            println!();
            if let Some(path) = Config::default_config_path() {
                println!("Config file: {}", path.display());
                if path.exists() {
                    println!("  (exists)");
                } else {
                    println!("  (not found - using defaults)");
                }
            }
        }
        None => {
            println!("Revlight - code review feedback, highlighted in place");
            println!();
            println!("Use --help for usage information");
        }
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
    fn test_parse_review() {
        let cli = Cli::try_parse_from([
            "revlight",
            "--backend-url",
            "http://127.0.0.1:5000",
            "--poll-interval",
            "500ms",
            "review",
            "src/app.py",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.backend_url.as_deref(), Some("http://127.0.0.1:5000"));
        assert_eq!(cli.poll_interval, Some(Duration::from_millis(500)));
        match cli.command {
            Some(Commands::Review(args)) => {
                assert_eq!(args.file, std::path::PathBuf::from("src/app.py"));
                assert!(args.json);
            }
            other => panic!("expected review, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_watch_defaults() {
        let cli = Cli::try_parse_from(["revlight", "w", "main.py"]).unwrap();
        match cli.command {
            Some(Commands::Watch(args)) => {
                assert_eq!(args.check_interval, Duration::from_millis(500));
                assert!(!args.no_initial);
            }
            other => panic!("expected watch, got {:?}", other),
        }
    }
}
