//! The snapshot store — the only state shared between refresh and scrape.
//!
//! Copy-on-write semantics: every refresh builds a complete new row list
//! outside the lock and swaps the `Arc` in; readers always observe a fully
//! formed prior or current version, never a partial write. Critical sections
//! are pointer swaps and `Arc` clones only.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// One exported observation: ordered label values plus a numeric value.
///
/// `labels` covers the process-wide extra labels (prepended by the
/// Collector) followed by the metric's own `label_names`, in order.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub labels: Vec<String>,
    pub value: f64,
}

impl Row {
    pub fn new(labels: Vec<String>, value: f64) -> Self {
        Self { labels, value }
    }
}

/// Clonable handle to the shared metric → rows cache.
#[derive(Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<HashMap<String, Arc<Vec<Row>>>>>,
}

impl SnapshotStore {
    /// Create a store with an empty entry per declared metric, so a metric
    /// that has never refreshed still renders its header with zero samples.
    pub fn new(metric_names: impl IntoIterator<Item = String>) -> Self {
        let map = metric_names
            .into_iter()
            .map(|name| (name, Arc::new(Vec::new())))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Atomically replace the entire row list for one metric.
    pub async fn replace_rows(&self, name: &str, rows: Vec<Row>) {
        let rows = Arc::new(rows);
        let mut map = self.inner.write().await;
        map.insert(name.to_string(), rows);
    }

    /// A consistent point-in-time view of every metric's rows.
    pub async fn read_all(&self) -> HashMap<String, Arc<Vec<Row>>> {
        let map = self.inner.read().await;
        map.clone()
    }

    /// The current rows for one metric, if it is declared.
    pub async fn rows_for(&self, name: &str) -> Option<Arc<Vec<Row>>> {
        let map = self.inner.read().await;
        map.get(name).cloned()
    }
}
