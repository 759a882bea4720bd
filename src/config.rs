use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to "walletq" if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub credential: CredentialConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the wallet REST API, e.g. "https://api.example.com/v1/"
  pub url: String,
  /// Per-request timeout applied by the HTTP client
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds before cached data is re-fetched on the next visit (0 = always)
  #[serde(default = "default_stale_time_secs")]
  pub stale_time_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: String::new(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time_secs: default_stale_time_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialConfig {
  /// Token file (default: $XDG_DATA_HOME/walletq/token)
  pub token_file: Option<PathBuf>,
  /// Environment variables checked before the token file
  #[serde(default = "default_env_vars")]
  pub env_vars: Vec<String>,
}

impl Default for CredentialConfig {
  fn default() -> Self {
    Self {
      token_file: None,
      env_vars: default_env_vars(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Default filter directive; RUST_LOG takes precedence
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Log directory (default: $XDG_DATA_HOME/walletq/logs)
  pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      dir: None,
    }
  }
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_stale_time_secs() -> u64 {
  300
}

fn default_env_vars() -> Vec<String> {
  vec!["WALLETQ_TOKEN".to_string()]
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Find the configuration file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (an error if it does not exist)
  /// 2. ./walletq.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/walletq/config.yaml
  pub fn locate(explicit_path: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit_path {
      Some(p) if p.exists() => Ok(Some(p.to_path_buf())),
      Some(p) => Err(eyre!("Config file not found: {}", p.display())),
      None => Ok(Self::find_config_file()),
    }
  }

  pub fn not_found() -> color_eyre::eyre::Report {
    eyre!(
      "No configuration file found. Create one at ~/.config/walletq/config.yaml\n\
               with at least:\n\n  api:\n    url: https://api.example.com/v1/"
    )
  }

  /// Defaults for everything except the API URL, for running without a file.
  pub fn from_api_url(url: String) -> Result<Self> {
    let mut config = Config {
      api: ApiConfig::default(),
      title: None,
      cache: CacheConfig::default(),
      credential: CredentialConfig::default(),
      logging: LoggingConfig::default(),
    };
    config.set_api_url(url)?;
    Ok(config)
  }

  pub fn set_api_url(&mut self, url: String) -> Result<()> {
    url::Url::parse(&url).map_err(|e| eyre!("api.url {:?} is not a valid URL: {}", url, e))?;
    self.api.url = url;
    Ok(())
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("walletq.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("walletq").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  pub fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    url::Url::parse(&config.api.url)
      .map_err(|e| eyre!("api.url {:?} is not a valid URL: {}", config.api.url, e))?;
    config.stale_time()?;
    Ok(config)
  }

  /// How long fetched data counts as fresh.
  pub fn stale_time(&self) -> Result<chrono::Duration> {
    let secs = self.cache.stale_time_secs;
    i64::try_from(secs)
      .ok()
      .and_then(chrono::Duration::try_seconds)
      .ok_or_else(|| eyre!("cache.stale_time_secs {} is out of range", secs))
  }

  pub fn token_file(&self) -> Result<PathBuf> {
    match &self.credential.token_file {
      Some(path) => Ok(path.clone()),
      None => Ok(data_dir()?.join("token")),
    }
  }

  pub fn log_dir(&self) -> Result<PathBuf> {
    match &self.logging.dir {
      Some(path) => Ok(path.clone()),
      None => Ok(data_dir()?.join("logs")),
    }
  }
}

/// Per-user data directory for walletq.
fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("walletq"))
}
