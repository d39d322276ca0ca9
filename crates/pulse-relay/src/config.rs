use serde::Deserialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_listen")]
    pub listen_addr: String,
    #[serde(default = "default_upstream")]
    pub upstream_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen(),
            upstream_url: default_upstream(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// `static`: use the server secret from the environment for every
    /// session. `token`: each client hands over its own short-lived token
    /// in its first control message.
    #[serde(default = "default_auth_mode")]
    pub mode: String,
    /// Name of the environment variable holding the server secret. The
    /// secret itself never lives in the config file.
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
    #[serde(default = "default_handoff_timeout")]
    pub handoff_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
            secret_env: default_secret_env(),
            handoff_timeout_secs: default_handoff_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_listen() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_upstream() -> String {
    "wss://api.x.ai/v1/realtime".to_string()
}

fn default_auth_mode() -> String {
    "static".to_string()
}

fn default_secret_env() -> String {
    "XAI_API_KEY".to_string()
}

fn default_handoff_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load configuration from a YAML file.
///
/// If the file does not exist a default configuration is returned and a
/// warning is emitted, so the relay can start with sensible defaults before
/// any config file has been written.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "configuration file not found; using defaults"
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

    let config: Config = serde_yml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;

    Ok(config)
}
