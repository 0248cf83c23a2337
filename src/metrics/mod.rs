use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Oldest entries are dropped once the store holds this many.
pub const MAX_ENTRIES: usize = 10_000;

/// One recorded operation timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String, // "list_by_category" | "get_by_id" | "upsert" | "delete" | "get_all_products" ...
    pub target: String,    // "upstream" | "gateway"
    pub duration_ns: u64,
    pub duration_us: f64,
    pub duration_ms: f64,
    pub item_count: usize,
    pub success: bool,
    pub notes: Option<String>,
}

impl MetricEntry {
    pub fn new(
        operation: impl Into<String>,
        target: impl Into<String>,
        elapsed: Duration,
        item_count: usize,
        success: bool,
        notes: Option<String>,
    ) -> Self {
        let duration_ns = elapsed.as_nanos() as u64;
        Self {
            timestamp: Utc::now(),
            operation: operation.into(),
            target: target.into(),
            duration_ns,
            duration_us: duration_ns as f64 / 1_000.0,
            duration_ms: duration_ns as f64 / 1_000_000.0,
            item_count,
            success,
            notes,
        }
    }

    pub fn upstream(operation: &str, elapsed: Duration, item_count: usize, success: bool) -> Self {
        Self::new(operation, "upstream", elapsed, item_count, success, None)
    }

    pub fn gateway(operation: &str, elapsed: Duration, item_count: usize, success: bool) -> Self {
        Self::new(operation, "gateway", elapsed, item_count, success, None)
    }
}

/// Bounded in-memory store of timing entries collected across requests.
#[derive(Debug)]
pub struct MetricsStore {
    entries: VecDeque<MetricEntry>,
    capacity: usize,
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1_024)),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, entry: MetricEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Aggregate stats per (operation, target) pair, ordered by that key.
    pub fn aggregated(&self) -> Vec<AggregatedMetric> {
        let mut groups: BTreeMap<(&str, &str), Vec<&MetricEntry>> = BTreeMap::new();
        for e in &self.entries {
            groups
                .entry((e.operation.as_str(), e.target.as_str()))
                .or_default()
                .push(e);
        }

        groups
            .into_iter()
            .map(|((operation, target), entries)| {
                let mut durations: Vec<u64> = entries.iter().map(|e| e.duration_ns).collect();
                durations.sort_unstable();
                let spread = Spread::of_sorted(&durations);

                AggregatedMetric {
                    operation: operation.to_string(),
                    target: target.to_string(),
                    sample_count: entries.len(),
                    failure_count: entries.iter().filter(|e| !e.success).count(),
                    item_total: entries.iter().map(|e| e.item_count).sum(),
                    min_ns: spread.min,
                    max_ns: spread.max,
                    avg_ns: spread.avg,
                    p50_ns: spread.p50,
                    p95_ns: spread.p95,
                    p99_ns: spread.p99,
                    avg_ms: spread.avg as f64 / 1_000_000.0,
                    p95_ms: spread.p95 as f64 / 1_000_000.0,
                }
            })
            .collect()
    }

    /// Every retained entry as CSV, oldest first. The header is always present.
    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(vec![]);
        wtr.write_record(CSV_HEADER)?;
        for e in &self.entries {
            wtr.serialize(e)?;
        }

        let data = wtr.into_inner()?;
        Ok(String::from_utf8(data)?)
    }
}

const CSV_HEADER: [&str; 9] = [
    "timestamp",
    "operation",
    "target",
    "duration_ns",
    "duration_us",
    "duration_ms",
    "item_count",
    "success",
    "notes",
];

/// Order statistics over durations sorted ascending.
#[derive(Debug, Default, PartialEq, Eq)]
struct Spread {
    min: u64,
    max: u64,
    avg: u64,
    p50: u64,
    p95: u64,
    p99: u64,
}

impl Spread {
    fn of_sorted(sorted: &[u64]) -> Self {
        let Some((&min, &max)) = sorted.first().zip(sorted.last()) else {
            return Self::default();
        };
        Self {
            min,
            max,
            avg: sorted.iter().sum::<u64>() / sorted.len() as u64,
            p50: percentile(sorted, 0.50),
            p95: percentile(sorted, 0.95),
            p99: percentile(sorted, 0.99),
        }
    }
}

/// Nearest-rank percentile, clamped to the last sample.
fn percentile(sorted: &[u64], q: f64) -> u64 {
    let rank = (sorted.len() as f64 * q) as usize;
    sorted
        .get(rank.min(sorted.len().saturating_sub(1)))
        .copied()
        .unwrap_or(0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedMetric {
    pub operation: String,
    pub target: String,
    pub sample_count: usize,
    pub failure_count: usize,
    pub item_total: usize,
    pub min_ns: u64,
    pub max_ns: u64,
    pub avg_ns: u64,
    pub p50_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
    pub avg_ms: f64,
    pub p95_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(op: &str, ns: u64, success: bool) -> MetricEntry {
        MetricEntry::upstream(op, Duration::from_nanos(ns), 1, success)
    }

    #[test]
    fn entry_converts_units() {
        let e = MetricEntry::gateway("get_all_products", Duration::from_micros(1_500), 4, true);
        assert_eq!(e.duration_ns, 1_500_000);
        assert!((e.duration_us - 1_500.0).abs() < f64::EPSILON);
        assert!((e.duration_ms - 1.5).abs() < f64::EPSILON);
        assert_eq!(e.target, "gateway");
    }

    #[test]
    fn store_drops_oldest_beyond_capacity() {
        let mut store = MetricsStore::with_capacity(2);
        store.record(entry("a", 1, true));
        store.record(entry("b", 2, true));
        store.record(entry("c", 3, true));
        assert_eq!(store.entries.len(), 2);
        let ops: Vec<String> = store.aggregated().into_iter().map(|m| m.operation).collect();
        assert_eq!(ops, vec!["b", "c"]);
    }

    #[test]
    fn aggregated_groups_and_counts_failures() {
        let mut store = MetricsStore::new();
        for ns in [10, 20, 30, 40] {
            store.record(entry("get_by_id", ns, ns != 40));
        }
        store.record(entry("upsert", 5, true));

        let agg = store.aggregated();
        assert_eq!(agg.len(), 2);
        let get = &agg[0];
        assert_eq!(get.operation, "get_by_id");
        assert_eq!(get.sample_count, 4);
        assert_eq!(get.failure_count, 1);
        assert_eq!(get.min_ns, 10);
        assert_eq!(get.max_ns, 40);
        assert_eq!(get.avg_ns, 25);
        assert_eq!(get.p50_ns, 30);
        assert_eq!(agg[1].operation, "upsert");
    }

    #[test]
    fn spread_of_sorted_durations() {
        let sorted: Vec<u64> = (1..=100).collect();
        let spread = Spread::of_sorted(&sorted);
        assert_eq!(spread.min, 1);
        assert_eq!(spread.max, 100);
        assert_eq!(spread.avg, 50);
        assert_eq!(spread.p50, 51);
        assert_eq!(spread.p95, 96);
        assert_eq!(spread.p99, 100);

        assert_eq!(Spread::of_sorted(&[]), Spread::default());
        assert_eq!(percentile(&[7], 0.99), 7);
    }

    #[test]
    fn empty_store_aggregates_to_nothing() {
        assert!(MetricsStore::new().aggregated().is_empty());
    }

    #[test]
    fn csv_has_header_and_one_row_per_entry() {
        let mut store = MetricsStore::new();
        store.record(entry("delete", 7, false));
        store.record(entry("delete", 8, true));
        let csv = store.to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,operation,target"));
        assert!(lines[1].contains(",delete,upstream,7,"));
        assert!(lines[1].contains(",false,"));
    }

    #[test]
    fn empty_csv_keeps_header() {
        let csv = MetricsStore::new().to_csv().unwrap();
        assert_eq!(csv.trim_end(), CSV_HEADER.join(","));
    }
}
