//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_MODELS: &str = "gemini-2.0-flash-lite,gemini-2.5-flash-lite,gemini-2.0-flash";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub environment: String,
    pub session_secret: Vec<u8>,
    pub llm_api_key: String,
    pub llm_api_base: Option<String>,
    pub generation_models: Vec<String>,
    pub validation_models: Vec<String>,
    pub default_temperature: f64,
    pub completion_timeout: Duration,
    pub semantic_validation: bool,
    pub cors_origin: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("environment", &self.environment)
            .field("llm_api_base", &self.llm_api_base)
            .field("generation_models", &self.generation_models)
            .field("validation_models", &self.validation_models)
            .field("default_temperature", &self.default_temperature)
            .field("completion_timeout", &self.completion_timeout)
            .field("semantic_validation", &self.semantic_validation)
            .field("cors_origin", &self.cors_origin)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Server and Database Settings ---
        let bind_address = parse_or("BIND_ADDRESS", lookup("BIND_ADDRESS"), "0.0.0.0:3000")?;
        let database_url = required("DATABASE_URL", lookup("DATABASE_URL"))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        // --- Secrets ---
        let secret_hex = required("SESSION_SECRET", lookup("SESSION_SECRET"))?;
        let session_secret = hex::decode(secret_hex.trim()).map_err(|e| {
            ConfigError::InvalidValue("SESSION_SECRET".to_string(), format!("not valid hex: {e}"))
        })?;
        if session_secret.len() < 16 {
            return Err(ConfigError::InvalidValue(
                "SESSION_SECRET".to_string(),
                "must decode to at least 16 bytes".to_string(),
            ));
        }
        let llm_api_key = required("LLM_API_KEY", lookup("LLM_API_KEY"))?;
        let llm_api_base = lookup("LLM_API_BASE").filter(|v| !v.trim().is_empty());

        // --- Completion Settings ---
        let generation_models = model_list("GENERATION_MODELS", lookup("GENERATION_MODELS"))?;
        let validation_models = model_list("VALIDATION_MODELS", lookup("VALIDATION_MODELS"))?;

        let default_temperature: f64 =
            parse_or("DEFAULT_TEMPERATURE", lookup("DEFAULT_TEMPERATURE"), "1.0")?;
        if !(0.0..=2.0).contains(&default_temperature) {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_TEMPERATURE".to_string(),
                "must be between 0.0 and 2.0".to_string(),
            ));
        }
        let timeout_secs: u64 =
            parse_or("COMPLETION_TIMEOUT_SECS", lookup("COMPLETION_TIMEOUT_SECS"), "60")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "COMPLETION_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let semantic_validation =
            parse_or("SEMANTIC_VALIDATION", lookup("SEMANTIC_VALIDATION"), "true")?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            environment,
            session_secret,
            llm_api_key,
            llm_api_base,
            generation_models,
            validation_models,
            default_temperature,
            completion_timeout: Duration::from_secs(timeout_secs),
            semantic_validation,
            cors_origin,
        })
    }

    /// The `Secure` cookie flag is dropped only for local development.
    pub fn secure_cookies(&self) -> bool {
        self.environment != "development"
    }
}

fn required(key: &str, value: Option<String>) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
}

fn parse_or<T>(key: &str, value: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = value.unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn model_list(key: &str, value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let raw = value.unwrap_or_else(|| DEFAULT_MODELS.to_string());
    let models: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if models.is_empty() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "at least one model is required".to_string(),
        ));
    }
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/study"),
        ("SESSION_SECRET", "00112233445566778899aabbccddeeff"),
        ("LLM_API_KEY", "key"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.generation_models.len(), 3);
        assert_eq!(config.generation_models, config.validation_models);
        assert_eq!(config.default_temperature, 1.0);
        assert_eq!(config.completion_timeout, Duration::from_secs(60));
        assert!(config.semantic_validation);
        assert!(!config.secure_cookies());
        assert_eq!(config.llm_api_base, None);
    }

    #[test]
    fn model_lists_are_trimmed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("GENERATION_MODELS", " a , b,, c "));
        pairs.push(("ENVIRONMENT", "production"));

        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.generation_models, vec!["a", "b", "c"]);
        assert!(config.secure_cookies());
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = Config::from_lookup(lookup(&REQUIRED[..1])).unwrap_err();

        assert!(matches!(err, ConfigError::MissingVar(var) if var == "SESSION_SECRET"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DEFAULT_TEMPERATURE", "3.5"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SEMANTIC_VALIDATION", "maybe"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("SESSION_SECRET", "not-hex");
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }
}
