mod api;
mod app;
mod cache;
mod commands;
mod config;
mod event;
mod forms;
mod logging;
mod net;
mod query;
mod retry;
mod session;
mod store;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "trk")]
#[command(about = "A terminal client for the trk project tracker")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/trk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API base URL, overriding the configured one
  #[arg(short, long)]
  api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Logs go to a file - the TUI owns the terminal
  let _log_guard = logging::init()?;

  let config = config::Config::load(args.config.as_deref())?;

  // Override API URL if specified on command line
  let config = if let Some(api_url) = args.api_url {
    config::Config {
      api: config::ApiConfig {
        url: api_url,
        ..config.api
      },
      ..config
    }
  } else {
    config
  };

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
