use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::catalogue::{Catalogue, CatalogueError};
use crate::eligibility::EvaluationConfig;

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
    pub engine: EngineConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineConfig::from_env()?,
        })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Catalogue source and evaluation policy.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// JSON catalogue to load instead of the embedded standard catalogue.
    pub catalogue_path: Option<PathBuf>,
    pub evaluation: EvaluationConfig,
}

impl EngineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let catalogue_path = env::var("BENEFIT_CATALOGUE_PATH")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        let defaults = EvaluationConfig::default();
        let default_threshold = match env::var("BENEFIT_DEFAULT_THRESHOLD") {
            Ok(value) => value
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|threshold| *threshold <= 100)
                .ok_or(ConfigError::InvalidDefaultThreshold)?,
            Err(_) => defaults.default_threshold,
        };
        let graph_threshold = match env::var("BENEFIT_GRAPH_THRESHOLD") {
            Ok(value) => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|threshold| (0.0..=1.0).contains(threshold))
                .ok_or(ConfigError::InvalidGraphThreshold)?,
            Err(_) => defaults.graph_threshold,
        };

        Ok(Self {
            catalogue_path,
            evaluation: EvaluationConfig {
                default_threshold,
                graph_threshold,
            },
        })
    }

    /// Loads the configured catalogue, falling back to the embedded one.
    pub fn load_catalogue(&self) -> Result<Catalogue, CatalogueError> {
        match &self.catalogue_path {
            Some(path) => Catalogue::from_path(path),
            None => Catalogue::standard(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDefaultThreshold,
    InvalidGraphThreshold,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDefaultThreshold => {
                write!(f, "BENEFIT_DEFAULT_THRESHOLD must be an integer between 0 and 100")
            }
            ConfigError::InvalidGraphThreshold => {
                write!(f, "BENEFIT_GRAPH_THRESHOLD must be a number between 0 and 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidDefaultThreshold
            | ConfigError::InvalidGraphThreshold => None,
        }
    }
}
