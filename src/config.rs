use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Base URL short links are shared under (defaults to the API url)
  pub frontend_url: Option<String>,
  /// Custom title for header
  pub title: Option<String>,
  #[serde(default)]
  pub queries: QueriesConfig,
  /// How long the "copied" indicator stays on, in milliseconds
  #[serde(default = "default_copy_feedback_ms")]
  pub copy_feedback_ms: u64,
  #[serde(default)]
  pub qr: QrConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api: ApiConfig::default(),
      frontend_url: None,
      title: None,
      queries: QueriesConfig::default(),
      copy_feedback_ms: default_copy_feedback_ms(),
      qr: QrConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_api_url")]
  pub url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
    }
  }
}

/// Stale windows per query, in milliseconds
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct QueriesConfig {
  pub my_urls_stale_ms: u64,
  pub total_clicks_stale_ms: u64,
  pub analytics_stale_ms: u64,
}

impl Default for QueriesConfig {
  fn default() -> Self {
    Self {
      my_urls_stale_ms: 10_000,
      total_clicks_stale_ms: 10_000,
      analytics_stale_ms: 5 * 60 * 1000,
    }
  }
}

impl QueriesConfig {
  pub fn my_urls_stale(&self) -> Duration {
    Duration::from_millis(self.my_urls_stale_ms)
  }

  pub fn total_clicks_stale(&self) -> Duration {
    Duration::from_millis(self.total_clicks_stale_ms)
  }

  pub fn analytics_stale(&self) -> Duration {
    Duration::from_millis(self.analytics_stale_ms)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QrConfig {
  /// Edge length of the vector QR code in pixels
  pub size: u32,
  /// Upscale factor applied when rasterizing
  pub scale: u32,
  /// Hand exported PNGs to the system handler before falling back to a download
  pub share: bool,
  /// Where exported PNGs land (defaults to the user's download directory)
  pub download_dir: Option<PathBuf>,
}

impl Default for QrConfig {
  fn default() -> Self {
    Self {
      size: 256,
      scale: 4,
      share: true,
      download_dir: None,
    }
  }
}

impl QrConfig {
  pub fn download_dir(&self) -> PathBuf {
    self
      .download_dir
      .clone()
      .or_else(dirs::download_dir)
      .or_else(dirs::home_dir)
      .unwrap_or_else(|| PathBuf::from("."))
  }
}

fn default_api_url() -> String {
  "http://localhost:8080".to_string()
}

fn default_copy_feedback_ms() -> u64 {
  3000
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./shortlink.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/shortlink/config.yaml
  ///
  /// Without a file every field takes its default. `SHORTLINK_API_URL`
  /// overrides `api.url` either way.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var("SHORTLINK_API_URL") {
      config.api.url = url;
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("shortlink.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("shortlink").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file deserializes to null
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Base URL used when building shareable short links.
  pub fn frontend_url(&self) -> &str {
    self
      .frontend_url
      .as_deref()
      .unwrap_or(&self.api.url)
      .trim_end_matches('/')
  }

  pub fn copy_feedback(&self) -> Duration {
    Duration::from_millis(self.copy_feedback_ms)
  }

  /// Get a bearer token from the environment, if one was provided.
  ///
  /// Checks SHORTLINK_TOKEN.
  pub fn env_token() -> Option<String> {
    std::env::var("SHORTLINK_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.url, "http://localhost:8080");
    assert_eq!(config.frontend_url(), "http://localhost:8080");
    assert_eq!(config.queries.my_urls_stale(), Duration::from_secs(10));
    assert_eq!(config.queries.total_clicks_stale(), Duration::from_secs(10));
    assert_eq!(config.queries.analytics_stale(), Duration::from_secs(300));
    assert_eq!(config.copy_feedback(), Duration::from_millis(3000));
    assert_eq!(config.qr.size, 256);
    assert_eq!(config.qr.scale, 4);
    assert!(config.qr.share);
  }

  #[test]
  fn test_partial_file() {
    let config = Config::parse(
      r#"
api:
  url: https://api.sho.rt
frontend_url: https://sho.rt/
queries:
  analytics_stale_ms: 1000
qr:
  share: false
  download_dir: /tmp/qr
"#,
    )
    .unwrap();

    assert_eq!(config.api.url, "https://api.sho.rt");
    assert_eq!(config.frontend_url(), "https://sho.rt");
    assert_eq!(config.queries.analytics_stale_ms, 1000);
    assert_eq!(config.queries.my_urls_stale_ms, 10_000);
    assert!(!config.qr.share);
    assert_eq!(config.qr.scale, 4);
    assert_eq!(config.qr.download_dir(), PathBuf::from("/tmp/qr"));
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/shortlink.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shortlink.yaml");
    std::fs::write(&path, "copy_feedback_ms: 500\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.copy_feedback(), Duration::from_millis(500));
  }
}
