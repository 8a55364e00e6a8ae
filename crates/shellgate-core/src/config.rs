use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::GatewayError;

pub const CONFIG_FILE_NAME: &str = "config.yml";
const DEFAULT_SECRET_FILE_NAME: &str = ".gitlab_shell_secret";
const DEFAULT_READ_TIMEOUT_SECS: u64 = 300;
const DEFAULT_LOG_LEVEL: &str = "info";

fn default_secret_file() -> PathBuf {
    PathBuf::from(DEFAULT_SECRET_FILE_NAME)
}

fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
/// Transport settings for internal API calls.
pub struct HttpSettingsConfig {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Request timeout in seconds.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout: u64,
}

impl Default for HttpSettingsConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: String::new(),
            read_timeout: default_read_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
/// Process-wide gateway configuration, read-only after startup.
pub struct GatewayConfig {
    #[serde(default)]
    pub gitlab_url: String,
    #[serde(default = "default_secret_file")]
    pub secret_file: PathBuf,
    /// Shared secret for the internal API. Filled from `secret_file` when
    /// not given inline.
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub http_settings: HttpSettingsConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gitlab_url: String::new(),
            secret_file: default_secret_file(),
            secret: String::new(),
            http_settings: HttpSettingsConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl GatewayConfig {
    pub fn new(gitlab_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            gitlab_url: gitlab_url.into(),
            secret: secret.into(),
            ..Self::default()
        }
    }

    /// Basic auth credentials, present only when both halves are set.
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        let user = self.http_settings.user.as_str();
        let password = self.http_settings.password.as_str();
        if user.is_empty() || password.is_empty() {
            return None;
        }
        Some((user, password))
    }
}

/// Loads `config.yml` from `root_dir` and resolves the shared secret.
pub fn load_config(root_dir: &Path) -> Result<GatewayConfig, GatewayError> {
    let path = root_dir.join(CONFIG_FILE_NAME);
    let contents = std::fs::read_to_string(&path).map_err(|error| {
        GatewayError::Config(format!("failed to read '{}': {error}", path.display()))
    })?;
    let mut config: GatewayConfig = serde_yaml::from_str(&contents).map_err(|error| {
        GatewayError::Config(format!("failed to parse '{}': {error}", path.display()))
    })?;

    let inline_secret = config.secret.trim().to_string();
    config.secret = if inline_secret.is_empty() {
        read_secret_file(root_dir, &config.secret_file)?
    } else {
        inline_secret
    };
    Ok(config)
}

fn read_secret_file(root_dir: &Path, secret_file: &Path) -> Result<String, GatewayError> {
    let path = if secret_file.is_absolute() {
        secret_file.to_path_buf()
    } else {
        root_dir.join(secret_file)
    };
    let secret = std::fs::read_to_string(&path).map_err(|error| {
        GatewayError::Config(format!(
            "failed to read secret file '{}': {error}",
            path.display()
        ))
    })?;
    Ok(secret.trim().to_string())
}
