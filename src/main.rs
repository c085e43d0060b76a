mod app;
mod cache;
mod commands;
mod config;
mod event;
mod filter;
mod ledger;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "divvy")]
#[command(about = "A terminal UI for shared team expenses, inspired by k9s")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/divvy/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Team to open on startup, matched by name
  #[arg(short, long)]
  team: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let _log_guard = init_logging()?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override default team if specified on command line
  let config = if let Some(team) = args.team {
    config::Config {
      default_team: Some(team),
      ..config
    }
  } else {
    config
  };

  // Initialize and run the app
  let mut app = app::App::new(config).await?;
  app.run().await?;

  Ok(())
}

/// Logs go to a file; the terminal belongs to the UI. Level comes from
/// DIVVY_LOG, off by default.
fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let dir = dirs::data_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("divvy");
  std::fs::create_dir_all(&dir)?;

  let appender = tracing_appender::rolling::daily(dir, "divvy.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_env("DIVVY_LOG").unwrap_or_else(|_| EnvFilter::new("off")))
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}
