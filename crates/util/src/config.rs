use std::{env, fmt, net::SocketAddr};

use super::{database_url, server_bind_address};

const DEVELOPMENT_SESSION_SECRET: &str = "hvac-portal-development-secret";

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Reads `APP_ENV`, defaulting to development when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        Self::from_str(&value)
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub database_url: String,
    pub session_secret: Vec<u8>,
    /// Identity promoted to the admin role when it signs in.
    pub owner_open_id: Option<String>,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env()?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;
        let session_secret = session_secret(environment)?;

        Ok(Self {
            bind_addr,
            environment,
            database_url: database_url(),
            session_secret,
            owner_open_id: env::var("OWNER_OPEN_ID")
                .ok()
                .filter(|value| !value.trim().is_empty()),
        })
    }
}

fn session_secret(environment: Environment) -> Result<Vec<u8>, ConfigError> {
    match env::var("SESSION_SECRET") {
        Ok(value) if !value.is_empty() => Ok(value.into_bytes()),
        _ if environment == Environment::Production => Err(ConfigError::MissingSessionSecret),
        _ => Ok(DEVELOPMENT_SESSION_SECRET.as_bytes().to_vec()),
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    MissingSessionSecret,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::MissingSessionSecret => {
                write!(f, "SESSION_SECRET must be set when APP_ENV is production")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ENV_GUARD;
    use crate::{DEFAULT_BIND_ADDR, DEFAULT_DATABASE_URL};

    fn clear_env() {
        for key in [
            "APP_ENV",
            "APP_BIND_ADDR",
            "DATABASE_URL",
            "SESSION_SECRET",
            "OWNER_OPEN_ID",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_in_development() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();

        let config = AppConfig::from_env().expect("config should load with defaults");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.session_secret, DEVELOPMENT_SESSION_SECRET.as_bytes());
        assert_eq!(config.owner_open_id, None);
    }

    #[test]
    fn rejects_invalid_environment() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("APP_ENV", "invalid");

        let err = AppConfig::from_env().expect_err("invalid env should error");
        assert!(matches!(err, ConfigError::InvalidEnvironment(value) if value == "invalid"));

        clear_env();
    }

    #[test]
    fn production_requires_session_secret() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("APP_ENV", "production");

        let err = AppConfig::from_env().expect_err("missing secret should error");
        assert!(matches!(err, ConfigError::MissingSessionSecret));

        clear_env();
    }

    #[test]
    fn parses_production_environment() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("APP_ENV", "production");
        env::set_var("APP_BIND_ADDR", "0.0.0.0:9000");
        env::set_var("DATABASE_URL", "sqlite:///var/lib/hvac/portal.db");
        env::set_var("SESSION_SECRET", "prod-secret");
        env::set_var("OWNER_OPEN_ID", "owner-1");

        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.database_url, "sqlite:///var/lib/hvac/portal.db");
        assert_eq!(config.session_secret, b"prod-secret");
        assert_eq!(config.owner_open_id.as_deref(), Some("owner-1"));

        clear_env();
    }
}
