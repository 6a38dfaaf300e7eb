//! Configuration system.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `CARINS_SERVER_HOST` - Server bind address
//! - `CARINS_SERVER_PORT` - Server port
//! - `CARINS_DATABASE_TYPE` - `sqlite` or `postgres`
//! - `CARINS_DATABASE_URL` - Database connection URL
//! - `CARINS_SEED_DEMO_DATA` - Insert demo owners/cars/policies into an empty store
//! - `CARINS_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
//! - `CARINS_EXPIRATION_CHECK_INTERVAL_SECS` - Seconds between expiration checks
//! - `CARINS_EXPIRATION_WINDOW_SECS` - How far back an expiration is still reported

use config::Config;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{InsuranceError, InsuranceResult};

/// Longest accepted expiration window: one leap year.
pub const MAX_EXPIRATION_WINDOW_SECS: u64 = 366 * 24 * 60 * 60;

/// Global configuration singleton.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Background job configuration
    pub jobs: JobsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite" or "postgres"
    pub db_type: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// PostgreSQL connection URL
    pub postgres_url: String,
    /// Seed demo data on startup when the store is empty
    pub seed_demo_data: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite://car_insurance.db?mode=rwc".to_string(),
            postgres_url: "postgres://localhost/car_insurance".to_string(),
            seed_demo_data: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Background job configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Seconds between policy expiration checks (default: 10 minutes)
    pub expiration_check_interval_secs: u64,
    /// Expirations older than this many seconds are not reported (default: 1 hour)
    pub expiration_window_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            expiration_check_interval_secs: 600,
            expiration_window_secs: 3600,
        }
    }
}

fn config_err(e: config::ConfigError) -> InsuranceError {
    InsuranceError::ConfigError(e.to_string())
}

impl AppConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    ///
    /// The result is not validated; see [`AppConfig::validate`].
    pub fn load() -> InsuranceResult<Self> {
        let defaults = AppConfig::default();

        let builder = Config::builder()
            .set_default("server.host", defaults.server.host)
            .map_err(config_err)?
            .set_default("server.port", 8080)
            .map_err(config_err)?
            .set_default("database.db_type", defaults.database.db_type)
            .map_err(config_err)?
            .set_default("database.sqlite_url", defaults.database.sqlite_url)
            .map_err(config_err)?
            .set_default("database.postgres_url", defaults.database.postgres_url)
            .map_err(config_err)?
            .set_default("database.seed_demo_data", defaults.database.seed_demo_data)
            .map_err(config_err)?
            .set_default("logging.level", defaults.logging.level)
            .map_err(config_err)?
            .set_default("jobs.expiration_check_interval_secs", 600)
            .map_err(config_err)?
            .set_default("jobs.expiration_window_secs", 3600)
            .map_err(config_err)?
            // Load from config.toml (optional)
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            .set_override_option("server.host", env::var("CARINS_SERVER_HOST").ok())
            .map_err(config_err)?
            .set_override_option(
                "server.port",
                env::var("CARINS_SERVER_PORT")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option("database.db_type", env::var("CARINS_DATABASE_TYPE").ok())
            .map_err(config_err)?
            .set_override_option(
                "database.sqlite_url",
                env::var("CARINS_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("sqlite")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.postgres_url",
                env::var("CARINS_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("postgres")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.seed_demo_data",
                env::var("CARINS_SEED_DEMO_DATA")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("CARINS_LOG_LEVEL").ok())
            .map_err(config_err)?
            .set_override_option(
                "jobs.expiration_check_interval_secs",
                env::var("CARINS_EXPIRATION_CHECK_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option(
                "jobs.expiration_window_secs",
                env::var("CARINS_EXPIRATION_WINDOW_SECS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?;

        let settings = builder
            .build()
            .map_err(|e| InsuranceError::ConfigError(format!("failed to build config: {e}")))?;

        settings.try_deserialize().map_err(|e| {
            InsuranceError::ConfigError(format!("failed to deserialize config: {e}"))
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> InsuranceResult<()> {
        if self.server.port == 0 {
            return Err(InsuranceError::ConfigError(
                "server.port must be greater than 0".to_string(),
            ));
        }

        match self.database.db_type.as_str() {
            "sqlite" | "postgres" => {}
            other => {
                return Err(InsuranceError::ConfigError(format!(
                    "database.db_type must be 'sqlite' or 'postgres', got '{other}'"
                )));
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(InsuranceError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        if self.jobs.expiration_check_interval_secs == 0 {
            return Err(InsuranceError::ConfigError(
                "jobs.expiration_check_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.jobs.expiration_window_secs == 0 {
            return Err(InsuranceError::ConfigError(
                "jobs.expiration_window_secs must be greater than 0".to_string(),
            ));
        }
        if self.jobs.expiration_window_secs > MAX_EXPIRATION_WINDOW_SECS {
            return Err(InsuranceError::ConfigError(format!(
                "jobs.expiration_window_secs must be at most {MAX_EXPIRATION_WINDOW_SECS}, got {}",
                self.jobs.expiration_window_secs
            )));
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> InsuranceResult<&'static AppConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = AppConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is valid.
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.jobs.expiration_check_interval_secs, 600);
        assert_eq!(config.jobs.expiration_window_secs, 3600);
    }

    #[test]
    fn rejects_unknown_database_type() {
        let mut config = AppConfig::default();
        config.database.db_type = "mysql".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("database.db_type"));
    }

    #[test]
    fn rejects_bad_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_interval() {
        let mut config = AppConfig::default();
        config.jobs.expiration_check_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn window_has_upper_bound() {
        let mut config = AppConfig::default();
        config.jobs.expiration_window_secs = MAX_EXPIRATION_WINDOW_SECS;
        assert!(config.validate().is_ok());

        config.jobs.expiration_window_secs = 100_000_000_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jobs.expiration_window_secs"));
    }
}
