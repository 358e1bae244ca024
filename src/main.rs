mod app;
mod cache;
mod commands;
mod config;
mod entities;
mod event;
mod query;
mod service;
mod session;
mod store;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "r9s")]
#[command(about = "A terminal dashboard for organizational resource tracking, inspired by k9s")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/r9s/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Service URL, overriding the config file
  #[arg(short, long)]
  service_url: Option<String>,
}

/// File logging; the terminal is owned by the UI, so nothing may write to
/// stderr while the app runs. Returns the guard that flushes on drop.
fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .map(|p| p.join("r9s"))
    .unwrap_or_else(|| PathBuf::from("."));
  std::fs::create_dir_all(&log_dir)?;

  let appender = tracing_appender::rolling::never(log_dir, "r9s.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("R9S_LOG").unwrap_or_else(|_| EnvFilter::new("r9s=info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _log_guard = init_logging()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override service URL if specified on command line
  let config = if let Some(url) = args.service_url {
    config::Config {
      service: config::ServiceConfig {
        url,
        ..config.service
      },
      ..config
    }
  } else {
    config
  };

  tracing::info!(url = %config.service.url, "starting r9s");

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
