use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::matching::MatchingConfig;

const DEV_TOKEN_SECRET: &str = "disaster-shield-development-secret";

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
    pub matching: MatchingConfig,
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
        let matching = load_matching(environment)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            matching,
        })
    }
}

fn load_matching(environment: AppEnvironment) -> Result<MatchingConfig, ConfigError> {
    let defaults = MatchingConfig::default();

    let invite_limit = match env::var("MATCH_INVITE_LIMIT") {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(limit) if limit > 0 => limit,
            _ => return Err(ConfigError::InvalidInviteLimit),
        },
        Err(_) => defaults.invite_limit,
    };

    let token_ttl_hours = match env::var("MATCH_TOKEN_TTL_HOURS") {
        Ok(raw) => match raw.trim().parse::<i64>() {
            Ok(hours) if hours > 0 => hours,
            _ => return Err(ConfigError::InvalidTokenTtl),
        },
        Err(_) => defaults.token_ttl_hours,
    };

    let token_secret = match env::var("MATCH_TOKEN_SECRET") {
        Ok(secret) if !secret.trim().is_empty() => secret,
        _ if environment == AppEnvironment::Production => {
            return Err(ConfigError::MissingTokenSecret)
        }
        _ => DEV_TOKEN_SECRET.to_string(),
    };

    let public_base_url = env::var("MATCH_PUBLIC_BASE_URL")
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .unwrap_or(defaults.public_base_url);

    Ok(MatchingConfig {
        invite_limit,
        token_ttl_hours,
        token_secret,
        public_base_url,
    })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidInviteLimit,
    InvalidTokenTtl,
    MissingTokenSecret,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidInviteLimit => {
                write!(f, "MATCH_INVITE_LIMIT must be a positive integer")
            }
            ConfigError::InvalidTokenTtl => {
                write!(f, "MATCH_TOKEN_TTL_HOURS must be a positive number of hours")
            }
            ConfigError::MissingTokenSecret => {
                write!(f, "MATCH_TOKEN_SECRET is required in production")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
