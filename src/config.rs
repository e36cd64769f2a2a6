use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT `{0}` is not a valid port number")]
    InvalidPort(String),

    #[error("HOST `{0}` is not a valid IP address")]
    InvalidHost(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl Environment {
    /// Unknown names fall back to development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" => Environment::Production,
            "testing" => Environment::Testing,
            _ => Environment::Development,
        }
    }
}

/// Process configuration, read once in `main` and handed to whatever needs it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub log_filter: String,
}

impl AppConfig {
    pub const DEFAULT_DATABASE_URL: &'static str = "sqlite://db/school_timetable.db";

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("APP_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development);

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| Self::DEFAULT_DATABASE_URL.to_string());

        let host = match lookup("HOST") {
            Some(raw) => raw
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidHost(raw))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => 5000,
        };

        let log_filter = lookup("RUST_LOG").unwrap_or_else(|| match environment {
            Environment::Production => "timetable=info".to_string(),
            _ => "timetable=debug".to_string(),
        });

        Ok(Self {
            environment,
            database_url,
            bind_addr: SocketAddr::new(host, port),
            log_filter,
        })
    }

    pub fn debug(&self) -> bool {
        self.environment != Environment::Production
    }

    /// File backing the database, if the URL points at one.
    pub fn sqlite_path(&self) -> Option<&Path> {
        let rest = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or_default();

        if path.is_empty() || path == ":memory:" {
            None
        } else {
            Some(Path::new(path))
        }
    }
}
