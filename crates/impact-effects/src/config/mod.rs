use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::enrichment::sources::gbif::DEFAULT_GBIF_URL;
use crate::enrichment::sources::overpass::DEFAULT_OVERPASS_URL;
use crate::enrichment::sources::usgs::DEFAULT_USGS_URL;
use crate::enrichment::EnrichmentSettings;

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
    pub sources: SourcesConfig,
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
            sources: SourcesConfig::load()?,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Endpoints and time budgets for the enrichment sources.
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub overpass_url: String,
    pub usgs_url: String,
    pub gbif_url: String,
    pub population_timeout: Duration,
    pub seismic_timeout: Duration,
    pub flora_fauna_timeout: Duration,
    pub seismic_radius_km: f64,
    pub gazetteer_csv: Option<PathBuf>,
}

impl SourcesConfig {
    fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            overpass_url: env::var("IMPACT_OVERPASS_URL")
                .unwrap_or_else(|_| DEFAULT_OVERPASS_URL.to_string()),
            usgs_url: env::var("IMPACT_USGS_URL").unwrap_or_else(|_| DEFAULT_USGS_URL.to_string()),
            gbif_url: env::var("IMPACT_GBIF_URL").unwrap_or_else(|_| DEFAULT_GBIF_URL.to_string()),
            population_timeout: timeout_var("IMPACT_POPULATION_TIMEOUT_MS", 30_000)?,
            seismic_timeout: timeout_var("IMPACT_SEISMIC_TIMEOUT_MS", 10_000)?,
            flora_fauna_timeout: timeout_var("IMPACT_FLORA_FAUNA_TIMEOUT_MS", 10_000)?,
            seismic_radius_km: radius_var("IMPACT_SEISMIC_RADIUS_KM", 250.0)?,
            gazetteer_csv: env::var("IMPACT_GAZETTEER_CSV")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn enrichment_settings(&self) -> EnrichmentSettings {
        EnrichmentSettings {
            population_timeout: self.population_timeout,
            seismic_timeout: self.seismic_timeout,
            flora_fauna_timeout: self.flora_fauna_timeout,
            seismic_radius_km: self.seismic_radius_km,
        }
    }
}

fn timeout_var(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|value| *value > 0)
            .map(Duration::from_millis)
            .ok_or(ConfigError::InvalidTimeout { variable: name }),
        Err(_) => Ok(Duration::from_millis(default_ms)),
    }
}

fn radius_var(name: &'static str, default_km: f64) -> Result<f64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value > 0.0)
            .ok_or(ConfigError::InvalidRadius { variable: name }),
        Err(_) => Ok(default_km),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout { variable: &'static str },
    InvalidRadius { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout { variable } => {
                write!(f, "{variable} must be a positive number of milliseconds")
            }
            ConfigError::InvalidRadius { variable } => {
                write!(f, "{variable} must be a positive number of kilometers")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout { .. }
            | ConfigError::InvalidRadius { .. } => None,
        }
    }
}
