use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub ledger: LedgerConfig,
  /// Team to open on startup, matched by name (optional)
  pub default_team: Option<String>,
  /// Custom title for the header (defaults to the ledger domain if not set)
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
  /// Base URL of the ledger service, e.g. https://ledger.example.com
  pub url: String,
  pub email: String,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./divvy.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/divvy/config.yaml
  /// 4. ~/.config/divvy/config.yaml
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
        "No configuration file found. Create one at ~/.config/divvy/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("divvy.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("divvy").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the ledger API token from environment variables.
  ///
  /// Checks DIVVY_API_TOKEN first, then LEDGER_API_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("DIVVY_API_TOKEN")
      .or_else(|_| std::env::var("LEDGER_API_TOKEN"))
      .map_err(|_| {
        eyre!(
          "Ledger API token not found. Set DIVVY_API_TOKEN or LEDGER_API_TOKEN environment variable."
        )
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_minimal_config() {
    let yaml = "ledger:\n  url: http://localhost:8080\n  email: you@example.com\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.ledger.url, "http://localhost:8080");
    assert!(config.default_team.is_none());
    assert!(config.title.is_none());
  }

  #[test]
  fn test_parse_full_config() {
    let yaml = "ledger:\n  url: https://ledger.example.com\n  email: you@example.com\n\
                default_team: Paris Trip\ntitle: Expenses\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.default_team.as_deref(), Some("Paris Trip"));
    assert_eq!(config.title.as_deref(), Some("Expenses"));
  }
}
