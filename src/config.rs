use std::net::{IpAddr, SocketAddr};

/// Application-level constants
pub const APP_NAME: &str = "FirstLine Triage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL_ID: &str = "medgemma:4b";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 150;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,firstline_triage=debug"
    } else {
        "info"
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}'")]
    InvalidValue { var: &'static str, value: String },
}

/// Runtime settings for the `serve` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub host: IpAddr,
    pub port: u16,
    pub model_id: String,
    pub ollama_host: String,
    pub generation_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub pull_model_on_start: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            model_id: DEFAULT_MODEL_ID.to_string(),
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            generation_timeout_secs: DEFAULT_GENERATION_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            pull_model_on_start: false,
        }
    }
}

impl ServiceConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Unset or blank variables keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = get("HOST") {
            config.host = parse("HOST", &v)?;
        }
        if let Some(v) = get("PORT") {
            config.port = parse("PORT", &v)?;
        }
        if let Some(v) = get("MEDGEMMA_MODEL_ID") {
            config.model_id = v;
        }
        if let Some(v) = get("OLLAMA_HOST") {
            config.ollama_host = normalize_ollama_host(&v);
        }
        if let Some(v) = get("GENERATION_TIMEOUT_SECS") {
            config.generation_timeout_secs = parse("GENERATION_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse("REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("PULL_MODEL_ON_START") {
            config.pull_model_on_start = parse_flag("PULL_MODEL_ON_START", &v)?;
        }

        if config.request_timeout_secs < config.generation_timeout_secs {
            tracing::warn!(
                request = config.request_timeout_secs,
                generation = config.generation_timeout_secs,
                "Request timeout is shorter than generation timeout; slow generations will fall back early"
            );
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Load an optional `.env` file. `FIRSTLINE_ENV_FILE` overrides the path.
/// Variables already set in the environment are not overwritten.
///
/// Runs before tracing is installed, so the loaded path is returned for the
/// caller to log.
pub fn load_env_file() -> Option<String> {
    load_env_file_from(std::env::var("FIRSTLINE_ENV_FILE").ok())
}

fn load_env_file_from(explicit: Option<String>) -> Option<String> {
    let loaded = match explicit {
        Some(path) => dotenvy::from_path(&path).map(|_| path),
        None => dotenvy::dotenv().map(|p| p.display().to_string()),
    };
    loaded.ok()
}

/// Ollama accepts `OLLAMA_HOST` without a scheme (`127.0.0.1:11434`).
fn normalize_ollama_host(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}
