//! HTTP client for the upstream inventory backend.
//!
//! Every operation issues exactly one request. Failures of any kind (transport,
//! unexpected status, undecodable body) are logged with their context and turned
//! into a sentinel outcome: an empty list, `None`, or `false`.

#[cfg(test)]
pub mod mock;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tracing::{debug, error, warn};

use crate::metrics::MetricEntry;
use crate::models::{ProductCategory, ProductRecord};
use crate::telemetry::Telemetry;

/// The backend operations the aggregator depends on.
#[async_trait]
pub trait InventoryBackend: Send + Sync {
    /// Products filed under `category`; empty on any failure.
    async fn list_by_category(&self, category: ProductCategory) -> Vec<ProductRecord>;

    /// `None` when the backend answers 404 or the call fails.
    async fn get_by_id(&self, id: &str) -> Option<ProductRecord>;

    /// `true` only for a 200 or 201 answer.
    async fn upsert(&self, product: &ProductRecord) -> bool;

    /// `true` only for a 200 or 204 answer.
    async fn delete(&self, id: &str, category: ProductCategory) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("malformed response body: {0}")]
    Decode(#[source] reqwest::Error),
}

pub struct HttpInventoryClient {
    http: reqwest::Client,
    base: Url,
    telemetry: Arc<dyn Telemetry>,
}

impl HttpInventoryClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        telemetry: Arc<dyn Telemetry>,
    ) -> anyhow::Result<Self> {
        let base = Url::parse(base_url)
            .with_context(|| format!("invalid upstream base URL: {base_url}"))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("upstream base URL cannot carry a path: {base_url}");
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build upstream HTTP client")?;

        Ok(Self {
            http,
            base,
            telemetry,
        })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn fetch_category(
        &self,
        category: ProductCategory,
    ) -> Result<Vec<ProductRecord>, UpstreamError> {
        let url = self.endpoint(&["api", "inventory", category.as_str(), "products"]);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(UpstreamError::Transport)?;

        match response.status() {
            StatusCode::OK => response.json().await.map_err(UpstreamError::Decode),
            status => Err(UpstreamError::Status(status)),
        }
    }

    async fn fetch_product(&self, id: &str) -> Result<Option<ProductRecord>, UpstreamError> {
        let url = self.endpoint(&["api", "products", id]);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(UpstreamError::Transport)?;

        match response.status() {
            StatusCode::OK => response
                .json()
                .await
                .map(Some)
                .map_err(UpstreamError::Decode),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(UpstreamError::Status(status)),
        }
    }

    async fn post_product(&self, product: &ProductRecord) -> Result<(), UpstreamError> {
        let url = self.endpoint(&["api", "inventory", product.category.as_str(), "products"]);
        let response = self
            .http
            .post(url)
            .json(product)
            .send()
            .await
            .map_err(UpstreamError::Transport)?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            status => Err(UpstreamError::Status(status)),
        }
    }

    async fn delete_product(
        &self,
        id: &str,
        category: ProductCategory,
    ) -> Result<(), UpstreamError> {
        let url = self.endpoint(&["api", "inventory", category.as_str(), "products", id]);
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(UpstreamError::Transport)?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            status => Err(UpstreamError::Status(status)),
        }
    }

    async fn observe(&self, operation: &str, start: Instant, item_count: usize, success: bool) {
        self.telemetry
            .record(MetricEntry::upstream(operation, start.elapsed(), item_count, success))
            .await;
    }
}

fn log_failure(operation: &str, subject: &str, err: &UpstreamError) {
    match err {
        UpstreamError::Status(status) => {
            warn!(operation, subject, status = status.as_u16(), "Upstream returned an error status")
        }
        UpstreamError::Transport(_) | UpstreamError::Decode(_) => {
            error!(operation, subject, error = %err, "Upstream call failed")
        }
    }
}

#[async_trait]
impl InventoryBackend for HttpInventoryClient {
    async fn list_by_category(&self, category: ProductCategory) -> Vec<ProductRecord> {
        let start = Instant::now();
        match self.fetch_category(category).await {
            Ok(products) => {
                debug!(%category, count = products.len(), "Fetched category");
                self.observe("list_by_category", start, products.len(), true).await;
                products
            }
            Err(e) => {
                log_failure("list_by_category", category.as_str(), &e);
                self.observe("list_by_category", start, 0, false).await;
                Vec::new()
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> Option<ProductRecord> {
        let start = Instant::now();
        match self.fetch_product(id).await {
            Ok(product) => {
                self.observe("get_by_id", start, usize::from(product.is_some()), true).await;
                product
            }
            Err(e) => {
                log_failure("get_by_id", id, &e);
                self.observe("get_by_id", start, 0, false).await;
                None
            }
        }
    }

    async fn upsert(&self, product: &ProductRecord) -> bool {
        let start = Instant::now();
        let outcome = self.post_product(product).await;
        if let Err(e) = &outcome {
            log_failure("upsert", product.id.as_deref().unwrap_or("<new>"), e);
        }
        self.observe("upsert", start, 1, outcome.is_ok()).await;
        outcome.is_ok()
    }

    async fn delete(&self, id: &str, category: ProductCategory) -> bool {
        let start = Instant::now();
        let outcome = self.delete_product(id, category).await;
        if let Err(e) = &outcome {
            log_failure("delete", id, e);
        }
        self.observe("delete", start, 1, outcome.is_ok()).await;
        outcome.is_ok()
    }
}
