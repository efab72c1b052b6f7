//! API configuration
//!
//! Every field can be set through a `DEMURRAGE_`-prefixed environment variable,
//! e.g. `DEMURRAGE_PORT=9090` or `DEMURRAGE_TIMEZONE=Asia/Singapore`.

use std::time::Duration;

use chrono_tz::Tz;
use config::{ConfigError, Environment};
use serde::Deserialize;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DEMURRAGE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Maximum pooled database connections
    pub database_max_connections: u32,
    /// JWT secret for administrator tokens
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// IANA name of the business timezone that defines "today"
    pub timezone: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Log level
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/demurrage".to_string(),
            database_max_connections: 10,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            timezone: "UTC".to_string(),
            request_timeout_secs: 30,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `DEMURRAGE_*` environment variables over the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_source(source: Environment) -> Result<Self, ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        config.timezone()?;
        Ok(config)
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parses the configured business timezone
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Message(format!("unknown timezone '{}'", self.timezone)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
