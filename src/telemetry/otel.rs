//! Log formatting and optional OTLP span export.

use std::collections::HashMap;

use anyhow::Context;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetryConfig;

const API_KEY_HEADER: &str = "x-honeycomb-team";

/// Owns the tracer provider so spans can be flushed on shutdown.
#[must_use]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    pub fn exporting(&self) -> bool {
        self.provider.is_some()
    }

    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            info!("Shutting down span export...");
            if let Err(e) = provider.shutdown() {
                warn!(error = %e, "Span exporter shutdown failed");
            }
        }
    }
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "info,inventory_gateway=debug"
    } else {
        "info"
    }
}

/// Installs the global subscriber. Export is attempted only when an OTLP
/// endpoint is configured; a failure to build the exporter is logged and the
/// service continues with local logs only.
pub fn init(cfg: &TelemetryConfig) -> TelemetryGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(cfg.debug)));

    let (provider, export_error) = match cfg.otlp_endpoint.as_deref() {
        Some(endpoint) => match build_provider(cfg, endpoint) {
            Ok(provider) => (Some(provider), None),
            Err(e) => (None, Some(e)),
        },
        None => (None, None),
    };

    let otel_layer = provider.as_ref().map(|p| {
        tracing_opentelemetry::layer().with_tracer(p.tracer(cfg.service_name.clone()))
    });

    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .with(otel_layer)
        .try_init();

    if let Some(p) = &provider {
        global::set_tracer_provider(p.clone());
        info!(
            service = %cfg.service_name,
            endpoint = cfg.otlp_endpoint.as_deref().unwrap_or_default(),
            "Span export enabled"
        );
    } else if let Some(e) = export_error {
        warn!(error = ?e, "Span export disabled: exporter setup failed");
    } else {
        info!("Span export disabled: OTEL_EXPORTER_OTLP_ENDPOINT not set");
    }

    TelemetryGuard { provider }
}

fn build_resource(cfg: &TelemetryConfig) -> Resource {
    Resource::builder_empty()
        .with_attributes([
            KeyValue::new("service.name", cfg.service_name.clone()),
            KeyValue::new("service.version", cfg.service_version.clone()),
            KeyValue::new("service.instance.id", cfg.instance_id.clone()),
            KeyValue::new("deployment.environment", cfg.environment.clone()),
        ])
        .build()
}

fn build_headers(cfg: &TelemetryConfig) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    if let Some(key) = &cfg.api_key {
        headers.insert(API_KEY_HEADER.to_string(), key.clone());
    }
    headers
}

fn build_provider(cfg: &TelemetryConfig, endpoint: &str) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(format!("{endpoint}/v1/traces"))
        .with_headers(build_headers(cfg))
        .build()
        .context("failed to build OTLP span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(build_resource(cfg))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(endpoint: Option<&str>, api_key: Option<&str>) -> TelemetryConfig {
        TelemetryConfig {
            service_name: "inventory-gateway".to_string(),
            service_version: "1.0.0".to_string(),
            environment: "test".to_string(),
            instance_id: "host-1".to_string(),
            otlp_endpoint: endpoint.map(str::to_string),
            api_key: api_key.map(str::to_string),
            debug: false,
        }
    }

    #[test]
    fn debug_toggle_changes_default_filter() {
        assert_eq!(default_directive(false), "info");
        assert!(default_directive(true).contains("inventory_gateway=debug"));
    }

    #[test]
    fn api_key_becomes_header() {
        let headers = build_headers(&cfg(None, Some("secret")));
        assert_eq!(headers.get(API_KEY_HEADER).map(String::as_str), Some("secret"));
        assert!(build_headers(&cfg(None, None)).is_empty());
    }

    #[test]
    fn init_without_endpoint_does_not_export() {
        let guard = init(&cfg(None, None));
        assert!(!guard.exporting());
        guard.shutdown();
    }

    #[test]
    fn provider_builds_for_http_endpoint() {
        let provider = build_provider(&cfg(Some("http://localhost:4318"), Some("k")), "http://localhost:4318");
        assert!(provider.is_ok());
        if let Ok(p) = provider {
            let _ = p.shutdown();
        }
    }
}
