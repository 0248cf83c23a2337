use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use indexmap::IndexSet;
use tracing::{debug, info};

use crate::metrics::MetricEntry;
use crate::models::{ProductCategory, ProductRecord, UnknownCategory};
use crate::telemetry::Telemetry;
use crate::upstream::InventoryBackend;

/// Validates categories and merges per-category results into one view.
///
/// Holds no product state; every call goes to the backend.
pub struct InventoryAggregator {
    backend: Arc<dyn InventoryBackend>,
    telemetry: Arc<dyn Telemetry>,
}

impl InventoryAggregator {
    pub fn new(backend: Arc<dyn InventoryBackend>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self { backend, telemetry }
    }

    /// Queries every category concurrently and unions the results.
    ///
    /// A category whose call fails contributes nothing. Duplicates (records
    /// equal in every field) collapse to one; first-seen order is kept.
    /// Dropping the returned future drops every in-flight category call.
    pub async fn list_all(&self) -> IndexSet<ProductRecord> {
        let start = Instant::now();

        let per_category = join_all(
            ProductCategory::all().map(|category| self.backend.list_by_category(category)),
        )
        .await;

        let fetched: usize = per_category.iter().map(Vec::len).sum();
        let products: IndexSet<ProductRecord> = per_category.into_iter().flatten().collect();

        debug!(
            fetched,
            distinct = products.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Aggregated all categories"
        );
        self.telemetry
            .record(MetricEntry::new(
                "list_all",
                "aggregator",
                start.elapsed(),
                products.len(),
                true,
                Some(format!("{fetched} fetched before de-duplication")),
            ))
            .await;

        products
    }

    pub async fn list_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<ProductRecord>, UnknownCategory> {
        let category: ProductCategory = category.parse()?;
        Ok(self.backend.list_by_category(category).await)
    }

    pub async fn get_by_id(&self, id: &str) -> Option<ProductRecord> {
        self.backend.get_by_id(id).await
    }

    /// Files `product` under `category`, which replaces whatever category the
    /// record carried. Returns the record as sent when the backend accepted
    /// it, `None` when it did not.
    pub async fn upsert(
        &self,
        category: &str,
        mut product: ProductRecord,
    ) -> Result<Option<ProductRecord>, UnknownCategory> {
        product.category = category.parse()?;
        if self.backend.upsert(&product).await {
            info!(id = ?product.id, category = %product.category, "Upserted product");
            Ok(Some(product))
        } else {
            Ok(None)
        }
    }

    pub async fn remove(&self, id: &str, category: &str) -> Result<bool, UnknownCategory> {
        let category: ProductCategory = category.parse()?;
        let removed = self.backend.delete(id, category).await;
        if removed {
            info!(id, %category, "Removed product");
        }
        Ok(removed)
    }

    pub async fn count(&self) -> usize {
        self.list_all().await.len()
    }
}
