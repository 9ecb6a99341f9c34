mod api;
mod app;
mod auth;
mod clipboard;
mod commands;
mod config;
mod event;
mod hooks;
mod logging;
mod qr;
mod query;
mod routes;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

use crate::api::HttpApi;
use crate::app::{App, Services};
use crate::auth::{AuthContext, TokenStore};
use crate::clipboard::Osc52;
use crate::config::Config;
use crate::event::EventHandler;
use crate::hooks::QueryContext;
use crate::qr::SystemOpen;
use crate::routes::Route;

#[derive(Parser, Debug)]
#[command(name = "shortlink")]
#[command(about = "A terminal dashboard for the ShortLink URL shortener")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/shortlink/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// ShortLink API base URL
  #[arg(long, env = "SHORTLINK_API_URL")]
  api_url: Option<String>,

  /// Path to open first, e.g. /dashboard or /s/abc123
  #[arg(short, long, default_value = "/")]
  route: String,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;
  if let Some(url) = args.api_url {
    config.api.url = url;
  }
  info!(api = %config.api.url, "starting");

  let store = TokenStore::new(&logging::data_dir());
  let token = Config::env_token().or_else(|| store.load());

  let api = HttpApi::new(&config.api.url)?;
  let ctx = QueryContext::new(Arc::new(api), AuthContext::new(token), config.queries)
    .with_token_store(store);

  let events = EventHandler::new(Duration::from_millis(250));
  let services = Services {
    ctx,
    config: Arc::new(config),
    events: events.sender(),
    clipboard: Arc::new(Mutex::new(Box::new(Osc52::stdout()))),
    sharer: Some(Arc::new(SystemOpen)),
  };

  // Initialize and run the app
  let mut app = App::new(services, Route::parse(&args.route));
  app.run(events).await?;

  info!("bye");
  Ok(())
}
