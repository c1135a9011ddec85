use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use crate::config::{parse_bool, ConfigError};

/// Used when `RUST_LOG` is unset or does not parse. Keeps pool and HTTP
/// internals quiet while report pipeline events stay visible.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn,reqwest=warn";

type InitResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

/// Where log lines end up once the subscriber is installed.
#[derive(Debug, Clone, PartialEq)]
pub enum LogSink {
    Console,
    Loki(Url),
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    pub fn from_source<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            loki_enabled: parse_bool(&get, "LOKI_ENABLED")?,
            loki_url: get("LOKI_URL").filter(|u| !u.trim().is_empty()),
            service_name: text("SERVICE_NAME", "ia_reportes"),
            environment: text("ENVIRONMENT", "development"),
            log_level: text("RUST_LOG", DEFAULT_FILTER),
        })
    }

    /// Resolves the sink, rejecting Loki shipping without a usable URL.
    pub fn sink(&self) -> Result<LogSink, ConfigError> {
        if !self.loki_enabled {
            return Ok(LogSink::Console);
        }

        let raw = self.loki_url.as_deref().ok_or_else(|| ConfigError::Invalid {
            key: "LOKI_URL".into(),
            value: "(unset while LOKI_ENABLED is true)".into(),
        })?;
        let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
            key: "LOKI_URL".into(),
            value: format!("{} ({})", raw, e),
        })?;
        Ok(LogSink::Loki(url))
    }

    /// The configured directives if they parse, otherwise [`DEFAULT_FILTER`].
    pub fn filter_directives(&self) -> &str {
        match EnvFilter::try_new(&self.log_level) {
            Ok(_) => &self.log_level,
            Err(_) => DEFAULT_FILTER,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::new(self.filter_directives())
    }
}

pub fn init_logging(config: LoggingConfig) -> InitResult {
    match config.sink()? {
        LogSink::Console => init_console_only(&config),
        LogSink::Loki(url) => init_with_loki(&config, url),
    }
}

fn init_console_only(config: &LoggingConfig) -> InitResult {
    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;

    if config.filter_directives() != config.log_level {
        tracing::warn!("Ignoring unparseable RUST_LOG '{}', using '{}'", config.log_level, DEFAULT_FILTER);
    }
    tracing::info!(
        "Console logging initialized for {} [{}] (filter: {})",
        config.service_name,
        config.environment,
        config.filter_directives()
    );
    Ok(())
}

#[cfg(feature = "loki")]
fn init_with_loki(config: &LoggingConfig, url: Url) -> InitResult {
    let endpoint = url.to_string();
    let (loki_layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .build_url(url)?;

    // Ships buffered log lines to Loki for the lifetime of the process.
    tokio::spawn(task);

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(loki_layer)
        .try_init()?;

    tracing::info!("Loki logging initialized at {}", endpoint);
    Ok(())
}

#[cfg(not(feature = "loki"))]
fn init_with_loki(config: &LoggingConfig, url: Url) -> InitResult {
    init_console_only(config)?;
    tracing::warn!("LOKI_ENABLED is set but this build lacks the loki feature; not shipping to {}", url);
    Ok(())
}
