//! Telemetry handle passed explicitly into the aggregator and the gateway.
//!
//! Operation timings go to a [`Telemetry`] implementation chosen at startup;
//! span export and log formatting live in [`otel`].

pub mod otel;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::metrics::{AggregatedMetric, MetricEntry, MetricsStore};

#[async_trait]
pub trait Telemetry: Send + Sync {
    async fn record(&self, entry: MetricEntry);

    async fn aggregated(&self) -> Vec<AggregatedMetric>;

    async fn export_csv(&self) -> anyhow::Result<String>;
}

/// Keeps recent operation timings in a bounded [`MetricsStore`].
#[derive(Debug, Default)]
pub struct InMemoryTelemetry {
    store: RwLock<MetricsStore>,
}

impl InMemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Telemetry for InMemoryTelemetry {
    async fn record(&self, entry: MetricEntry) {
        self.store.write().await.record(entry);
    }

    async fn aggregated(&self) -> Vec<AggregatedMetric> {
        self.store.read().await.aggregated()
    }

    async fn export_csv(&self) -> anyhow::Result<String> {
        self.store.read().await.to_csv()
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

#[async_trait]
impl Telemetry for NoopTelemetry {
    async fn record(&self, _entry: MetricEntry) {}

    async fn aggregated(&self) -> Vec<AggregatedMetric> {
        Vec::new()
    }

    async fn export_csv(&self) -> anyhow::Result<String> {
        MetricsStore::new().to_csv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn in_memory_records_and_aggregates() {
        let telemetry = InMemoryTelemetry::new();
        telemetry
            .record(MetricEntry::upstream("get_by_id", Duration::from_millis(2), 1, true))
            .await;
        telemetry
            .record(MetricEntry::upstream("get_by_id", Duration::from_millis(4), 0, false))
            .await;

        let agg = telemetry.aggregated().await;
        assert_eq!(agg.len(), 1);
        assert_eq!(agg[0].sample_count, 2);
        assert_eq!(agg[0].failure_count, 1);
        assert_eq!(telemetry.export_csv().await.unwrap().lines().count(), 3);
    }

    #[tokio::test]
    async fn noop_keeps_nothing() {
        let telemetry = NoopTelemetry;
        telemetry
            .record(MetricEntry::gateway("count", Duration::from_millis(1), 5, true))
            .await;
        assert!(telemetry.aggregated().await.is_empty());
        assert_eq!(telemetry.export_csv().await.unwrap().lines().count(), 1);
    }
}
