use chrono::NaiveDate;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::lookup::MAX_TTL_DAYS;

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
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub stats: StatsConfig,
    pub data: DataSources,
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

        let base_url = env::var("REPRESENT_BASE_URL")
            .unwrap_or_else(|_| UpstreamConfig::DEFAULT_BASE_URL.to_string());
        let timeout_ms = parse_number("REPRESENT_TIMEOUT_MS", 5_000)?;
        let ttl_days: i64 =
            parse_bounded("POSTAL_CACHE_TTL_DAYS", 30, MAX_TTL_DAYS.unsigned_abs())?;
        let render_limit: usize = parse_bounded("STATS_RENDER_LIMIT", 20, MAX_RENDER_LIMIT)?;

        let session_start = match env::var("SESSION_START") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .map_err(|_| ConfigError::InvalidSessionStart(raw))?,
            ),
            _ => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            upstream: UpstreamConfig {
                base_url,
                timeout: Duration::from_millis(timeout_ms),
            },
            cache: CacheConfig {
                postal_code_ttl_days: ttl_days,
            },
            stats: StatsConfig {
                render_limit,
                session_start,
            },
            data: DataSources {
                roster: path_var("ROSTER_CSV"),
                votes: path_var("VOTES_CSV"),
                manual_mappings: path_var("MANUAL_MAPPINGS_CSV"),
                district_aliases: path_var("DISTRICT_ALIASES_CSV"),
                bill_categories: path_var("BILL_CATEGORIES_CSV"),
            },
        })
    }
}

fn parse_number(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

/// Parses `key` and rejects values above `max` or outside the target type.
fn parse_bounded<T: TryFrom<u64>>(
    key: &'static str,
    default: u64,
    max: u64,
) -> Result<T, ConfigError> {
    let value = parse_number(key, default)?;
    if value > max {
        return Err(ConfigError::OutOfRange { key, max });
    }
    T::try_from(value).map_err(|_| ConfigError::OutOfRange { key, max })
}

fn path_var(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

/// Upper bound for `STATS_RENDER_LIMIT`; each rendered bill may be classified inline.
pub const MAX_RENDER_LIMIT: u64 = 200;

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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where and how long to wait for the Represent postal code service.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://represent.opennorth.ca";
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub postal_code_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Number of newest votes categorized synchronously per statistics request.
    pub render_limit: usize,
    /// `None` disables session filtering entirely.
    pub session_start: Option<NaiveDate>,
}

/// Optional CSV files used to hydrate the in-memory store on startup.
#[derive(Debug, Clone, Default)]
pub struct DataSources {
    pub roster: Option<PathBuf>,
    pub votes: Option<PathBuf>,
    pub manual_mappings: Option<PathBuf>,
    pub district_aliases: Option<PathBuf>,
    pub bill_categories: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    OutOfRange { key: &'static str, max: u64 },
    InvalidSessionStart(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
            ConfigError::OutOfRange { key, max } => {
                write!(f, "{key} must not exceed {max}")
            }
            ConfigError::InvalidSessionStart(raw) => {
                write!(f, "SESSION_START '{raw}' must be formatted as YYYY-MM-DD")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::OutOfRange { .. }
            | ConfigError::InvalidSessionStart(_) => None,
        }
    }
}
