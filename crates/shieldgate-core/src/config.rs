// Application configuration
//
// AppConfig is built once at startup and handed to each component's
// constructor. Nothing reads the environment after that.

use std::time::Duration;

use thiserror::Error;

use crate::shield::ShieldMode;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_YIELD_BASE_URL: &str = "https://api.yield.xyz";
const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 10_000;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid value for {var}: {message}")]
    Invalid { var: String, message: String },
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!(
                "unknown environment '{}'. Use 'development', 'test' or 'production'",
                other
            )),
        }
    }
}

/// Shield selection and policy knobs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShieldConfig {
    pub mode: ShieldMode,
    /// Empty means every chain id is accepted
    pub allowed_chain_ids: Vec<u64>,
    /// Empty means every yield is accepted
    pub supported_yields: Vec<String>,
}

/// Top-level service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub port: u16,
    /// None selects the in-memory store (not allowed in production)
    pub database_url: Option<String>,
    pub app_api_key: String,
    pub yield_base_url: String,
    pub yield_api_key: Option<String>,
    pub signer_private_key: Option<String>,
    pub use_mock_provider: bool,
    pub shield: ShieldConfig,
    pub upstream_timeout: Duration,
    /// Example: API_PREFIX="/api" results in routes like /api/v1/workflows
    pub api_prefix: String,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let environment = parse_var(&get, "APP_ENV", Environment::default())?;
        let port = parse_var(&get, "PORT", DEFAULT_PORT)?;
        let upstream_timeout_ms =
            parse_var(&get, "UPSTREAM_TIMEOUT_MS", DEFAULT_UPSTREAM_TIMEOUT_MS)?;
        let use_mock_provider = parse_bool(&get, "USE_MOCK_PROVIDER")?;
        let shield_mode = parse_var(&get, "SHIELD_MODE", ShieldMode::default())?;

        let allowed_chain_ids = split_list(get("SHIELD_ALLOWED_CHAIN_IDS"))
            .into_iter()
            .map(|id| {
                id.parse::<u64>().map_err(|e| ConfigError::Invalid {
                    var: "SHIELD_ALLOWED_CHAIN_IDS".to_string(),
                    message: format!("'{}': {}", id, e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let config = Self {
            environment,
            port,
            database_url: get("DATABASE_URL"),
            app_api_key: get("APP_API_KEY").unwrap_or_default(),
            yield_base_url: get("YIELD_BASE_URL")
                .unwrap_or_else(|| DEFAULT_YIELD_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            yield_api_key: get("YIELD_API_KEY"),
            signer_private_key: get("SIGNER_PRIVATE_KEY"),
            use_mock_provider,
            shield: ShieldConfig {
                mode: shield_mode,
                allowed_chain_ids,
                supported_yields: split_list(get("SHIELD_SUPPORTED_YIELDS")),
            },
            upstream_timeout: Duration::from_millis(upstream_timeout_ms),
            api_prefix: get("API_PREFIX").unwrap_or_default(),
            cors_allowed_origins: split_list(get("CORS_ALLOWED_ORIGINS")),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field requirements, reporting every missing variable at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();

        if self.app_api_key.is_empty() {
            missing.push("APP_API_KEY".to_string());
        }
        if self.is_production() {
            if self.database_url.is_none() {
                missing.push("DATABASE_URL".to_string());
            }
            if !self.use_mock_provider && self.yield_api_key.is_none() {
                missing.push("YIELD_API_KEY".to_string());
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn parse_var<G, T>(get: &G, name: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: name.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, name: &str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name).map(|v| v.trim().to_lowercase()) {
        None => Ok(false),
        Some(v) if v == "true" || v == "1" => Ok(true),
        Some(v) if v == "false" || v == "0" => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            var: name.to_string(),
            message: format!("expected true or false, got '{}'", v),
        }),
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}
