use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
    #[error("invalid DATABASE_URL: {0}")]
    DatabaseUrl(String),
}

/// Contact details printed in document headers.
#[derive(Debug, Clone)]
pub struct BakeryProfile {
    pub name: String,
    pub location: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub ssl: bool,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url)
                .map_err(|e| ConfigError::DatabaseUrl(e.to_string()));
        }

        let ssl_mode = if self.ssl { PgSslMode::Require } else { PgSslMode::Disable };

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(ssl_mode))
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub service_name: String,
    pub output_dir: PathBuf,
    pub row_limit: i64,
    pub default_window_days: i64,
    pub database: DatabaseConfig,
    pub bakery: BakeryProfile,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_source<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let row_limit: i64 = parse_or(&get, "REPORT_ROW_LIMIT", 10)?;
        let default_window_days: i64 = parse_or(&get, "DEFAULT_WINDOW_DAYS", 30)?;
        if default_window_days < 0 {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_WINDOW_DAYS".into(),
                value: default_window_days.to_string(),
            });
        }

        let database = DatabaseConfig {
            url: get("DATABASE_URL").filter(|u| !u.trim().is_empty()),
            host: text("DB_HOST", "localhost"),
            port: parse_or(&get, "DB_PORT", 5432)?,
            name: text("DB_NAME", "panaderia"),
            user: text("DB_USER", "postgres"),
            password: text("DB_PASSWORD", ""),
            ssl: parse_bool(&get, "DB_SSL")?,
            max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 5)?,
            acquire_timeout: Duration::from_secs(parse_or(&get, "DB_ACQUIRE_TIMEOUT_SECS", 10)?),
        };

        Ok(Self {
            host: text("SERVER_HOST", "127.0.0.1"),
            port: parse_or(&get, "SERVER_PORT", 5000)?,
            environment: text("ENVIRONMENT", "development"),
            service_name: text("SERVICE_NAME", "ia_reportes"),
            output_dir: PathBuf::from(text("REPORTS_OUTPUT_DIR", "outputs")),
            row_limit: row_limit.clamp(1, 100),
            default_window_days,
            database,
            bakery: BakeryProfile {
                name: text("PANADERIA_NOMBRE", "Mi Panadería"),
                location: text("PANADERIA_UBICACION", "Tu Ciudad"),
                phone: text("PANADERIA_TELEFONO", "+123456789"),
                email: text("PANADERIA_EMAIL", "info@panaderia.com"),
            },
        })
    }
}

pub(crate) fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
    }
}

pub(crate) fn parse_bool<F>(get: &F, key: &str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(false),
        Some(v) if v.is_empty() || v == "false" || v == "0" => Ok(false),
        Some(v) if v == "true" || v == "1" => Ok(true),
        Some(v) => Err(ConfigError::Invalid { key: key.to_string(), value: v }),
    }
}
