use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::listings::search::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::listings::LifecycleSettings;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub moderation: ModerationSettings,
    pub lifecycle: LifecycleConfig,
    pub search: SearchConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => raw.parse()?,
            Err(_) => LogFormat::Compact,
        };

        let policy_path = optional_path("APP_MODERATION_POLICY");
        let locations_path = optional_path("APP_LOCATIONS");

        let validity_days: u32 = parse_number("APP_LISTING_VALIDITY_DAYS", 30)?;
        if validity_days == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "APP_LISTING_VALIDITY_DAYS",
                value: validity_days.to_string(),
            });
        }
        let sweep_interval_secs: u64 = parse_number("APP_SWEEP_INTERVAL_SECS", 86_400)?;
        if sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "APP_SWEEP_INTERVAL_SECS",
                value: sweep_interval_secs.to_string(),
            });
        }
        let default_page_size: usize = parse_number("APP_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if default_page_size == 0 || default_page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidNumber {
                name: "APP_DEFAULT_PAGE_SIZE",
                value: default_page_size.to_string(),
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            moderation: ModerationSettings {
                policy_path,
                locations_path,
            },
            lifecycle: LifecycleConfig {
                validity_days,
                sweep_interval_secs,
            },
            search: SearchConfig { default_page_size },
        })
    }

    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            validity_days: self.lifecycle.validity_days,
            default_page_size: self.search.default_page_size,
        }
    }
}

fn optional_path(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

fn parse_number<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Full,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "full" | "pretty" => Ok(Self::Full),
            other => Err(ConfigError::InvalidLogFormat(other.to_string())),
        }
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Data files feeding the moderation engine and the location tables.
#[derive(Debug, Clone, Default)]
pub struct ModerationSettings {
    /// JSON moderation policy; the built-in policy applies when unset.
    pub policy_path: Option<PathBuf>,
    /// JSON seed of cities and neighborhoods.
    pub locations_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub struct LifecycleConfig {
    pub validity_days: u32,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub default_page_size: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("APP_LOG_FORMAT must be 'compact' or 'full', got '{0}'")]
    InvalidLogFormat(String),
    #[error("{name} has an invalid value '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}
