use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    #[serde(default)]
    pub model_mapping: ModelMappingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub allow_lan_access: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allow_lan_access: false,
        }
    }
}

impl ServerConfig {
    /// `allow_lan_access` widens a loopback host to all interfaces.
    pub fn bind_host(&self) -> &str {
        if self.allow_lan_access && self.host == default_host() {
            "0.0.0.0"
        } else {
            self.host.as_str()
        }
    }
}

/// OpenAI-compatible backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Tried in order; later entries are fallbacks.
    #[serde(default = "default_base_urls")]
    pub base_urls: Vec<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable consulted when `api_key` is unset.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub proxy_url: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_urls: default_base_urls(),
            api_key: None,
            api_key_env: default_api_key_env(),
            proxy_url: None,
        }
    }
}

impl UpstreamConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelMappingConfig {
    /// Client model id -> backend model id, applied before the built-in aliases
    #[serde(default)]
    pub custom: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,
}

impl LoggingConfig {
    /// `EnvFilter` directives for the bridge's own crates and the HTTP trace layer
    pub fn filter_directives(&self) -> String {
        if !self.enabled {
            return "off".to_string();
        }
        let level = self.level.trim();
        format!("gembridge={0},gembridge_core={0},tower_http={0}", level)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            enabled: default_logging_enabled(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RateLimitConfig {
    /// Minimum seconds between generation requests; unset disables limiting
    #[serde(default)]
    pub interval_seconds: Option<u64>,

    /// Sleep until the next slot instead of answering 429
    #[serde(default)]
    pub wait: bool,
}

// Default value functions
fn default_port() -> u16 { 8045 }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_base_urls() -> Vec<String> { vec!["https://api.openai.com/v1".to_string()] }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_request_timeout() -> u64 { 600 }
fn default_log_level() -> String { "info".to_string() }
fn default_logging_enabled() -> bool { true }

/// Get default config file path
/// Uses ~/.config/gembridge/config.toml for Unix-like CLI experience
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("gembridge")
        .join("config.toml")
}

/// A loaded config and the file it came from (`None` for built-in defaults)
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: Option<PathBuf>,
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load config from file, or return defaults if not found.
///
/// Loading order:
/// 1. Specified path (if provided)
/// 2. ./config.toml (if exists)
/// 3. default_config_path() (usually ~/.config/gembridge/config.toml)
pub fn load_config(path: Option<PathBuf>) -> anyhow::Result<LoadedConfig> {
    if let Some(config_path) = path {
        if !config_path.exists() {
            anyhow::bail!("Specified config file not found: {:?}", config_path);
        }
        let config = read_config(&config_path)?;
        tracing::info!("Loaded config from specified path {:?}", config_path);
        return Ok(LoadedConfig {
            config,
            source: Some(config_path),
        });
    }

    // Try current directory config.toml
    let local_config = PathBuf::from("config.toml");
    if local_config.exists() {
        match read_config(&local_config) {
            Ok(config) => {
                tracing::info!("Loaded config from current directory {:?}", local_config);
                return Ok(LoadedConfig {
                    config,
                    source: Some(local_config),
                });
            }
            Err(e) => {
                tracing::error!("Failed to load ./config.toml: {}. Falling back to default path.", e);
            }
        }
    }

    let default_path = default_config_path();
    if default_path.exists() {
        let config = read_config(&default_path)?;
        tracing::info!("Loaded config from default path {:?}", default_path);
        Ok(LoadedConfig {
            config,
            source: Some(default_path),
        })
    } else {
        tracing::info!("No config file found, using defaults");
        Ok(LoadedConfig {
            config: Config::default(),
            source: None,
        })
    }
}
