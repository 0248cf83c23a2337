use std::time::Duration;

use anyhow::Context;

const DEFAULT_UPSTREAM_URL: &str = "http://localhost:5001";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5001,http://127.0.0.1:5001";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Base URL of the inventory backend, without a trailing slash.
    pub upstream_url: String,
    pub upstream_timeout: Duration,
    pub cors_origins: Vec<String>,
    pub telemetry: TelemetryConfig,
}

/// Service identity tags and optional OTLP export settings.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub instance_id: String,
    /// OTLP/HTTP endpoint; `None` disables span export.
    pub otlp_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub debug: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT")
                .unwrap_or_else(|| "8000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            upstream_url: var("UPSTREAM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            upstream_timeout: Duration::from_secs(
                var("UPSTREAM_TIMEOUT_SECS")
                    .unwrap_or_else(|| "10".to_string())
                    .parse()
                    .context("UPSTREAM_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            cors_origins: var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            telemetry: TelemetryConfig {
                service_name: var("OTEL_SERVICE_NAME")
                    .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
                service_version: var("OTEL_SERVICE_VERSION")
                    .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
                environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
                instance_id: var("HOSTNAME").unwrap_or_else(|| "unknown".to_string()),
                otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT")
                    .map(|e| e.trim_end_matches('/').to_string()),
                api_key: var("HONEYCOMB_API_KEY"),
                debug: var("OTEL_DEBUG")
                    .map(|v| v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
