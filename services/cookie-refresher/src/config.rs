//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The admin token is loaded from the ADMIN_TOKEN env var or token_file,
//! never stored in the TOML directly to avoid leaking secrets.

use common::Secret;
use cookie_refresh::RefreshSchedule;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub admin: AdminConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// Admin API listener settings
#[derive(Debug, Deserialize)]
pub struct AdminConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(skip)]
    pub token: Option<Secret<String>>,
    /// Path to a file containing the admin token (alternative to ADMIN_TOKEN env var)
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

/// Account store location
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    pub path: PathBuf,
}

/// Background refresh timing, all in seconds
#[derive(Debug, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_spacing")]
    pub spacing_secs: u64,
    #[serde(default = "default_error_cooldown")]
    pub error_cooldown_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            spacing_secs: default_spacing(),
            error_cooldown_secs: default_error_cooldown(),
        }
    }
}

impl RefreshConfig {
    /// Worker schedule built from these settings.
    pub fn schedule(&self) -> RefreshSchedule {
        RefreshSchedule {
            check_interval: Duration::from_secs(self.check_interval_secs),
            spacing: Duration::from_secs(self.spacing_secs),
            error_cooldown: Duration::from_secs(self.error_cooldown_secs),
        }
    }
}

fn default_max_connections() -> usize {
    64
}

fn default_check_interval() -> u64 {
    1800
}

fn default_spacing() -> u64 {
    30
}

fn default_error_cooldown() -> u64 {
    60
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Admin token resolution order:
    /// 1. ADMIN_TOKEN env var (trimmed, blank counts as unset)
    /// 2. token_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.admin.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        let intervals = [
            ("check_interval_secs", config.refresh.check_interval_secs),
            ("spacing_secs", config.refresh.spacing_secs),
            ("error_cooldown_secs", config.refresh.error_cooldown_secs),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(common::Error::Config(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        let env_token = std::env::var("ADMIN_TOKEN")
            .ok()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());
        if let Some(token) = env_token {
            config.admin.token = Some(Secret::new(token));
        } else if let Some(ref token_file) = config.admin.token_file {
            let token = std::fs::read_to_string(token_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read token_file {}: {e}",
                    token_file.display()
                ))
            })?;
            let token = token.trim().to_owned();
            if !token.is_empty() {
                config.admin.token = Some(Secret::new(token));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("cookie-refresher.toml")
    }
}
