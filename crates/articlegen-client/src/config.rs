use std::path::PathBuf;

use crate::generation::GenerationStrategy;

pub const DEFAULT_BASE_URL: &str = "https://article-generator-backend-9hj2.onrender.com";
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;
pub const MIN_TIMEOUT_MS: u64 = 250;

pub const ENV_BASE_URL: &str = "ARTICLEGEN_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "ARTICLEGEN_TIMEOUT_MS";
pub const ENV_GENERATION_STRATEGY: &str = "ARTICLEGEN_GENERATION_STRATEGY";
pub const ENV_CREDENTIAL_PATH: &str = "ARTICLEGEN_CREDENTIAL_PATH";

pub const SOURCE_DEFAULT: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("base url must not be empty")]
    EmptyBaseUrl,
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
    #[error("invalid {ENV_TIMEOUT_MS} value '{value}'")]
    InvalidTimeout { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub strategy: GenerationStrategy,
    /// Where the file-backed credential store lives. `None` means the
    /// platform default.
    pub credential_path: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            strategy: GenerationStrategy::default(),
            credential_path: None,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = match env_non_empty(ENV_BASE_URL) {
            Some(base_url) => normalize_base_url(&base_url)?,
            None => normalize_base_url(DEFAULT_BASE_URL)?,
        };

        let timeout_ms = match env_non_empty(ENV_TIMEOUT_MS) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout { value: raw })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        let (strategy, strategy_source) = resolve_generation_strategy();
        tracing::debug!(
            strategy = strategy.as_str(),
            source = %strategy_source,
            "resolved generation strategy"
        );

        let credential_path = env_non_empty(ENV_CREDENTIAL_PATH).map(PathBuf::from);

        Ok(Self {
            base_url,
            timeout_ms,
            strategy,
            credential_path,
        })
    }

    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.max(MIN_TIMEOUT_MS)
    }
}

pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ConfigError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

/// Falls back to one-shot generation when the variable is unset or
/// unparseable; the returned source string says which happened.
#[must_use]
pub fn resolve_generation_strategy() -> (GenerationStrategy, String) {
    if let Some(raw) = env_non_empty(ENV_GENERATION_STRATEGY) {
        if let Some(strategy) = GenerationStrategy::parse(&raw) {
            return (strategy, ENV_GENERATION_STRATEGY.to_string());
        }
        return (
            GenerationStrategy::default(),
            format!(
                "{ENV_GENERATION_STRATEGY}:invalid({raw})->{}",
                GenerationStrategy::default().as_str()
            ),
        );
    }

    (GenerationStrategy::default(), SOURCE_DEFAULT.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
