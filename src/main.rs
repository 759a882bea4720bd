mod app;
mod auth;
mod commands;
mod config;
mod event;
mod logging;
mod query;
mod ui;
mod wallet;

use std::path::PathBuf;
use std::sync::Arc;

use auth::{ChainCredentialStore, CredentialStore, EnvCredentialStore, FileCredentialStore, Session};
use clap::Parser;
use color_eyre::Result;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "walletq")]
#[command(about = "A terminal wallet client backed by an authenticated query cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/walletq/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Wallet API base URL, overrides api.url
  #[arg(long)]
  api_url: Option<String>,

  /// File holding the bearer token, overrides credential.token_file
  #[arg(long)]
  token_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // A bare --api-url is enough to run without a config file
  let mut config = match (config::Config::locate(args.config.as_deref())?, args.api_url) {
    (Some(path), url) => {
      let mut config = config::Config::load_from_path(&path)?;
      if let Some(url) = url {
        config.set_api_url(url)?;
      }
      config
    }
    (None, Some(url)) => config::Config::from_api_url(url)?,
    (None, None) => return Err(config::Config::not_found()),
  };
  if let Some(path) = args.token_file {
    config.credential.token_file = Some(path);
  }

  let _log_guard = logging::init(&config.logging, &config.log_dir()?)?;
  info!(api = %config.api.url, "starting walletq");

  let runtime = tokio::runtime::Handle::current();

  let stores: Vec<Box<dyn CredentialStore>> = vec![
    Box::new(EnvCredentialStore::new(config.credential.env_vars.clone())),
    Box::new(FileCredentialStore::new(config.token_file()?)),
  ];
  let store: Arc<dyn CredentialStore> = Arc::new(ChainCredentialStore::new(stores));
  let session = Session::load(store, &runtime);

  let cache = query::QueryCache::new(runtime);
  let client = wallet::WalletClient::new(&config)?;
  let queries = wallet::WalletQueries::new(cache, client, session).with_stale_time(config.stale_time()?);

  let mut app = app::App::new(config, queries);
  app.run().await?;

  info!("exiting");
  Ok(())
}
