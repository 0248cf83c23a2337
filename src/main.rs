use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

mod config;
mod error;
mod handlers;
mod inventory;
mod metrics;
mod models;
mod telemetry;
mod upstream;

use crate::config::Config;
use crate::inventory::InventoryAggregator;
use crate::telemetry::{InMemoryTelemetry, Telemetry};
use crate::upstream::HttpInventoryClient;

/// Identity reported by `/` and `/health/upstream`.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub upstream_url: String,
}

/// Shared application state; cheap to clone (all heap behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub inventory: Arc<InventoryAggregator>,
    pub telemetry: Arc<dyn Telemetry>,
    pub service: Arc<ServiceInfo>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    let guard = telemetry::otel::init(&config.telemetry);

    info!(
        service = %config.telemetry.service_name,
        version = %config.telemetry.service_version,
        environment = %config.telemetry.environment,
        span_export = guard.exporting(),
        "Starting inventory gateway"
    );

    let telemetry: Arc<dyn Telemetry> = Arc::new(InMemoryTelemetry::new());
    let client = HttpInventoryClient::new(
        &config.upstream_url,
        config.upstream_timeout,
        telemetry.clone(),
    )?;
    info!(
        upstream = %config.upstream_url,
        timeout_s = config.upstream_timeout.as_secs(),
        "Upstream inventory backend configured"
    );

    let state = AppState {
        inventory: Arc::new(InventoryAggregator::new(Arc::new(client), telemetry.clone())),
        telemetry,
        service: Arc::new(ServiceInfo {
            name: config.telemetry.service_name.clone(),
            version: config.telemetry.service_version.clone(),
            upstream_url: config.upstream_url.clone(),
        }),
    };

    let app = build_router(state, &config.cors_origins);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    guard.shutdown();
    info!("Shutdown complete");
    Ok(())
}

pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        // ── Service ─────────────────────────────────────────────────────────
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/health/upstream", get(handlers::upstream_health))

        // ── Products ────────────────────────────────────────────────────────
        .route("/products", get(handlers::products::list_products))
        .route("/products/:id", get(handlers::products::get_product))

        // ── Categories ──────────────────────────────────────────────────────
        .route("/categories", get(handlers::list_categories))
        .route(
            "/categories/:category/products",
            get(handlers::products::list_category_products)
                .post(handlers::products::upsert_product),
        )
        .route(
            "/categories/:category/products/:id",
            delete(handlers::products::remove_product),
        )

        // ── Metrics ─────────────────────────────────────────────────────────
        .route("/metrics", get(handlers::metrics::get_metrics))
        .route("/metrics/csv", get(handlers::metrics::export_csv))

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    // A wildcard origin cannot be combined with credentials.
    if origins.iter().any(|origin| origin == "*") {
        if origins.len() > 1 {
            warn!(?origins, "Wildcard CORS origin overrides the other listed origins");
        }
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
