//! Logging and tracing configuration.
//!
//! Structured JSON output in production, human-readable output in
//! development, selected by environment with a `LOG_FORMAT` override.

use std::env;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match env::var("ENVIRONMENT")
            .or_else(|_| env::var("ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "prod" | "production" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        }
    }

    pub fn default_log_level(&self) -> Level {
        match self {
            Self::Development => Level::DEBUG,
            Self::Staging | Self::Production => Level::INFO,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` overrides the filter; `LOG_FORMAT=json|pretty` overrides the
/// environment-based format choice.
pub fn init_tracing() {
    let environment = Environment::from_env();

    let use_json = env::var("LOG_FORMAT")
        .map(|f| f.to_lowercase() == "json")
        .unwrap_or_else(|_| environment.is_production());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "{}={},tower_http=debug,axum=debug,hyper=warn,reqwest=warn",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                environment.default_log_level()
            ))
        })
        .unwrap();

    if use_json {
        let json_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_level(true)
            .with_filter(env_filter);

        tracing_subscriber::registry().with(json_layer).init();
    } else {
        let pretty_layer = fmt::layer()
            .pretty()
            .with_target(true)
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(env_filter);

        tracing_subscriber::registry().with(pretty_layer).init();
    }
}
