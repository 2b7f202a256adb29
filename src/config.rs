use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for the header (defaults to the API domain if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the backend API, e.g. "https://api.example.com/api/"
  pub url: String,
  /// Seconds between connectivity probes
  #[serde(default = "default_probe_interval")]
  pub probe_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Disable the on-disk cache entirely (cache misses on every lookup)
  #[serde(default = "default_true")]
  pub enabled: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { enabled: true }
  }
}

fn default_true() -> bool {
  true
}

fn default_probe_interval() -> u64 {
  15
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./trk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/trk/config.yaml
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/trk/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("trk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("trk").join("config.yaml");
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

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_minimal() {
    let config = Config::parse("api:\n  url: https://api.example.com/api/\n").unwrap();
    assert_eq!(config.api.url, "https://api.example.com/api/");
    assert_eq!(config.api.probe_interval_secs, 15);
    assert!(config.cache.enabled);
    assert!(config.title.is_none());
  }

  #[test]
  fn test_parse_full() {
    let yaml = "\
api:
  url: http://localhost:8000/api/
  probe_interval_secs: 5
title: Staging
cache:
  enabled: false
";
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.api.probe_interval_secs, 5);
    assert_eq!(config.title.as_deref(), Some("Staging"));
    assert!(!config.cache.enabled);
  }

  #[test]
  fn test_parse_missing_api_is_error() {
    assert!(Config::parse("title: oops\n").is_err());
  }
}
