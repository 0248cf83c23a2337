//! In-process [`InventoryBackend`] that records every call.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::InventoryBackend;
use crate::models::{ProductCategory, ProductRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(ProductCategory),
    Get(String),
    Upsert(ProductRecord),
    Delete(String, ProductCategory),
}

#[derive(Default)]
pub struct RecordingBackend {
    pub by_category: HashMap<ProductCategory, Vec<ProductRecord>>,
    pub failing: HashSet<ProductCategory>,
    pub products: HashMap<String, ProductRecord>,
    pub upsert_ok: bool,
    pub delete_ok: bool,
    pub list_delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: ProductCategory, products: Vec<ProductRecord>) -> Self {
        self.by_category.insert(category, products);
        self
    }

    pub fn failing(mut self, category: ProductCategory) -> Self {
        self.failing.insert(category);
        self
    }

    pub fn with_product(mut self, product: ProductRecord) -> Self {
        if let Some(id) = product.id.clone() {
            self.products.insert(id, product);
        }
        self
    }

    pub fn accepting_writes(mut self) -> Self {
        self.upsert_ok = true;
        self.delete_ok = true;
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of list calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl InventoryBackend for RecordingBackend {
    async fn list_by_category(&self, category: ProductCategory) -> Vec<ProductRecord> {
        self.push(Call::List(category));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&category) {
            return Vec::new();
        }
        self.by_category.get(&category).cloned().unwrap_or_default()
    }

    async fn get_by_id(&self, id: &str) -> Option<ProductRecord> {
        self.push(Call::Get(id.to_string()));
        self.products.get(id).cloned()
    }

    async fn upsert(&self, product: &ProductRecord) -> bool {
        self.push(Call::Upsert(product.clone()));
        self.upsert_ok
    }

    async fn delete(&self, id: &str, category: ProductCategory) -> bool {
        self.push(Call::Delete(id.to_string(), category));
        self.delete_ok
    }
}
