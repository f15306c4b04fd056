//! Configuration management for the vault fetcher
//!
//! Settings are layered with the following precedence, lowest first:
//! 1. Built-in defaults
//! 2. Config file (`--config`, `./vodvault.toml` or the user config directory)
//! 3. Environment variables, including those loaded from `.env`
//! 4. Command line flags
//!
//! Credentials are never read from the config file; see [`crate::auth`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::app::{ApiPaths, ClientConfig};
use crate::constants::{env, files, sync};
use crate::errors::{ConfigError, ConfigResult};

/// Contents of the TOML config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Vault origin, e.g. `https://vault.example`
    pub base_url: Option<String>,
    /// Account whose recordings are listed
    pub target_user: Option<String>,
    /// Snapshot document path
    pub output: Option<PathBuf>,
    /// Listing page size
    pub page_size: Option<usize>,
    /// API resource layout
    pub api: ApiPaths,
    /// HTTP client settings
    pub client: ClientConfig,
    /// File this configuration was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub target_user: Option<String>,
    pub output: Option<PathBuf>,
    pub page_size: Option<usize>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Vault origin, validated; `None` if not configured anywhere
    pub base_url: Option<Url>,
    /// Account to list; `None` means the authenticated user
    pub target_user: Option<String>,
    /// Snapshot document path
    pub output: PathBuf,
    /// Listing page size, at least 1
    pub page_size: usize,
    /// API resource layout
    pub api: ApiPaths,
    /// HTTP client settings
    pub client: ClientConfig,
    /// Config file the settings were layered on, if any
    pub config_file: Option<PathBuf>,
}

impl Settings {
    /// The vault base URL, required for any network command
    pub fn require_base_url(&self) -> ConfigResult<&Url> {
        self.base_url.as_ref().ok_or_else(|| ConfigError::MissingField {
            field: "base URL".to_string(),
            env_var: env::BASE_URL.to_string(),
        })
    }
}

impl AppConfig {
    /// Load the config file
    ///
    /// An explicit path must exist. Without one, the standard locations are
    /// searched and defaults are used when none holds a file.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Self::load_from_file(&path).await,
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(files::LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::user_config_path() {
            search_paths.push(path);
        }

        search_paths.into_iter().find(|path| {
            let exists = path.exists();
            if exists {
                debug!("Found config file: {}", path.display());
            }
            exists
        })
    }

    /// Config file path in the user's config directory
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::CONFIG_DIR_NAME).join(files::CONFIG_FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config: AppConfig =
            toml::from_str(&content).map_err(|source| ConfigError::InvalidFormat {
                path: path.to_path_buf(),
                source,
            })?;
        config.source = Some(path.to_path_buf());

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Layer the process environment and command line over this file config
    pub fn resolve(self, overrides: &ConfigOverrides) -> ConfigResult<Settings> {
        self.resolve_with(|key| std::env::var(key).ok(), overrides)
    }

    /// Layer `lookup` (an environment) and command line values over this file config
    ///
    /// Empty environment values count as unset.
    pub fn resolve_with<F>(self, lookup: F, overrides: &ConfigOverrides) -> ConfigResult<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base_url = overrides
            .base_url
            .clone()
            .or_else(|| lookup(env::BASE_URL))
            .or(self.base_url)
            .map(|raw| parse_base_url(&raw))
            .transpose()?;

        let target_user = overrides
            .target_user
            .clone()
            .or_else(|| lookup(env::TARGET_USER))
            .or(self.target_user);

        let output = overrides
            .output
            .clone()
            .or_else(|| lookup(env::OUTPUT).map(PathBuf::from))
            .or(self.output)
            .unwrap_or_else(|| PathBuf::from(sync::DEFAULT_OUTPUT));

        let env_page_size = lookup(env::PAGE_SIZE)
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .map_err(|e| ConfigError::InvalidValue {
                        field: "page size".to_string(),
                        value: raw.clone(),
                        reason: e.to_string(),
                    })
            })
            .transpose()?;
        let page_size = overrides
            .page_size
            .or(env_page_size)
            .or(self.page_size)
            .unwrap_or(sync::DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "page size".to_string(),
                value: "0".to_string(),
                reason: "Page size must be at least 1".to_string(),
            });
        }

        Ok(Settings {
            base_url,
            target_user,
            output,
            page_size,
            api: self.api,
            client: self.client,
            config_file: self.source,
        })
    }
}

/// Parse and validate the vault base URL
fn parse_base_url(raw: &str) -> ConfigResult<Url> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: "base URL".to_string(),
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("Scheme must be http or https".to_string()));
    }
    if url.host_str().is_none() {
        return Err(invalid("URL has no host".to_string()));
    }
    Ok(url)
}
