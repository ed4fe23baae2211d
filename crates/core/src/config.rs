//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` under the user's
//! config directory, then `GAMETRACK__*` environment variables
//! (e.g. `GAMETRACK__SOURCE__API_KEY`).

use std::{
    fs,
    path::{Path, PathBuf},
};

use ::config::{Config, Environment, File};
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory under the platform config/data roots.
pub const APP_DIR: &str = "gametrack";
/// Worksheet holding the tracked games.
pub const DEFAULT_WORKSHEET: &str = "Steam_Master";
/// Local hour at which the cached catalog expires.
pub const DEFAULT_CUTOVER_HOUR: u32 = 20;
/// Results revealed per "load more".
pub const DEFAULT_PAGE_SIZE: usize = 20;

const ENV_PREFIX: &str = "GAMETRACK";

const DEFAULT_CONFIG: &str = r#"# gametrack configuration

[source]
# Spreadsheet id from the sheet URL.
# spreadsheet_id = ""
worksheet = "Steam_Master"
# Either an API key or an OAuth access token.
# api_key = ""
# access_token = ""
# Read a local JSON export instead of the Sheets API.
# snapshot_path = "/path/to/catalog.json"

[cache]
# Local hour (Central European time) at which the cached catalog expires.
cutover_hour = 20

[view]
page_size = 20
show_adult = false
"#;

/// Where the catalog comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Spreadsheet id.
    pub spreadsheet_id: Option<String>,
    /// Worksheet (tab) name.
    pub worksheet: String,
    /// Sheets API key.
    pub api_key: Option<String>,
    /// OAuth bearer token, preferred over `api_key` when both are set.
    pub access_token: Option<String>,
    /// Override for the Sheets API host.
    pub api_base: Option<String>,
    /// Local JSON export used instead of the API.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            worksheet: DEFAULT_WORKSHEET.to_string(),
            api_key: None,
            access_token: None,
            api_base: None,
            snapshot_path: None,
        }
    }
}

/// Catalog cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Local hour of the daily cutover.
    pub cutover_hour: u32,
    /// Directory for cached windows. Defaults to `<data_dir>/cache`.
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cutover_hour: DEFAULT_CUTOVER_HOUR,
            dir: None,
        }
    }
}

/// Browsing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Results revealed per page step.
    pub page_size: usize,
    /// Start with adult content visible.
    pub show_adult: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            show_adult: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Catalog source.
    pub source: SourceConfig,
    /// Cache policy.
    pub cache: CacheConfig,
    /// Browsing defaults.
    pub view: ViewConfig,
    /// Root for favorites, lists and the cache.
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            cache: CacheConfig::default(),
            view: ViewConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl AppConfig {
    /// Load from the default config file and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from `path` (optional) and environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        let config: Self = settings
            .try_deserialize()
            .context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the core cannot work with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.cache.cutover_hour < 24,
            "cache.cutover_hour must be between 0 and 23, got {}",
            self.cache.cutover_hour
        );
        ensure!(self.view.page_size > 0, "view.page_size must be positive");
        ensure!(
            !self.source.worksheet.trim().is_empty(),
            "source.worksheet must not be empty"
        );
        Ok(())
    }

    /// Directory holding cached catalog windows.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache
            .dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("cache"))
    }

    /// Directory holding favorites and lists.
    pub fn curation_dir(&self) -> PathBuf {
        self.data_dir.join("curation")
    }
}

/// Default config file location.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Write a commented default config when none exists. Returns its path.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_file_parses_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        write_default_config(&path)?;
        assert!(path.is_file());

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.source.worksheet, DEFAULT_WORKSHEET);
        assert_eq!(config.cache.cutover_hour, DEFAULT_CUTOVER_HOUR);
        assert_eq!(config.view.page_size, DEFAULT_PAGE_SIZE);
        assert!(!config.view.show_adult);
        Ok(())
    }

    #[test]
    fn existing_file_is_not_overwritten() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "[view]\npage_size = 50\n")?;
        write_default_config(&path)?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.view.page_size, 50);
        assert_eq!(config.source.worksheet, DEFAULT_WORKSHEET);
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\ncutover_hour = 24\n")?;
        assert!(AppConfig::load_from(&path).is_err());

        fs::write(&path, "[view]\npage_size = 0\n")?;
        assert!(AppConfig::load_from(&path).is_err());
        Ok(())
    }

    #[test]
    fn cache_dir_defaults_under_data_dir() {
        let config = AppConfig {
            data_dir: PathBuf::from("/tmp/gametrack"),
            ..AppConfig::default()
        };
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/gametrack/cache"));
        assert_eq!(
            config.curation_dir(),
            PathBuf::from("/tmp/gametrack/curation")
        );
    }
}
