use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub service: ServiceConfig,
  /// Custom title for the header (defaults to the service domain if not set)
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Base URL of the hosted data service, e.g. https://myorg.example.co
  pub url: String,
  /// Project api key. Prefer the R9S_SERVICE_KEY environment variable over
  /// writing it into the config file.
  pub api_key: Option<String>,
}

impl ServiceConfig {
  /// Get the api key from the config file or environment.
  ///
  /// Checks the config first, then R9S_SERVICE_KEY.
  pub fn resolve_api_key(&self) -> Result<String> {
    if let Some(key) = &self.api_key {
      return Ok(key.clone());
    }
    std::env::var("R9S_SERVICE_KEY").map_err(|_| {
      eyre!("service api key not found. Set R9S_SERVICE_KEY or service.api_key in the config.")
    })
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./r9s.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/r9s/config.yaml
  /// 4. ~/.config/r9s/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "no configuration file found. Create one at ~/.config/r9s/config.yaml\n\
         with at least:\n\n  service:\n    url: https://your-project.example.co"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("r9s.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("r9s").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("failed to parse config file {}: {}", path.display(), e))?;

    // Catch a broken URL at startup rather than on the first query.
    url::Url::parse(&config.service.url)
      .map_err(|e| eyre!("invalid service url '{}': {}", config.service.url, e))?;

    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_minimal_config() {
    let config: Config = serde_yaml::from_str(
      "service:\n  url: https://myorg.example.co\n",
    )
    .unwrap();
    assert_eq!(config.service.url, "https://myorg.example.co");
    assert!(config.service.api_key.is_none());
    assert!(config.title.is_none());
  }

  #[test]
  fn test_config_api_key_wins_over_env() {
    let config = ServiceConfig {
      url: "https://myorg.example.co".to_string(),
      api_key: Some("from-config".to_string()),
    };
    assert_eq!(config.resolve_api_key().unwrap(), "from-config");
  }
}
