//! Collector — orchestrates execution and projection into the snapshot store.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use cloudgauge_spec::MetricSpec;

use crate::executor;
use crate::projector::{self, ProjectError};
use crate::query::QueryEval;
use crate::remote::{FetchError, RemoteClient};
use crate::snapshot::SnapshotStore;

/// Why one metric's refresh failed. Always recovered per metric: the prior
/// snapshot stays in place (stale-but-available).
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Project(#[from] ProjectError),
}

/// Runs the refresh pipeline for every declared metric and owns the
/// snapshot store the scrape path reads from.
pub struct Collector<C, Q> {
    specs: Arc<Vec<MetricSpec>>,
    client: C,
    query: Q,
    /// Process-wide label values prepended to every row (e.g. region, env).
    extra_label_values: Vec<String>,
    store: SnapshotStore,
}

impl<C: RemoteClient, Q: QueryEval> Collector<C, Q> {
    /// Create a collector with an empty snapshot entry per declared metric.
    pub fn new(
        specs: Arc<Vec<MetricSpec>>,
        client: C,
        query: Q,
        extra_label_values: Vec<String>,
    ) -> Self {
        let store = SnapshotStore::new(specs.iter().map(|s| s.name().to_string()));
        Self {
            specs,
            client,
            query,
            extra_label_values,
            store,
        }
    }

    /// The declared metrics, in document order.
    pub fn specs(&self) -> &Arc<Vec<MetricSpec>> {
        &self.specs
    }

    /// A handle to the snapshot store (for the scrape path).
    pub fn store(&self) -> SnapshotStore {
        self.store.clone()
    }

    /// Refresh a single metric: execute the remote call, project the
    /// responses, prepend extra label values, and swap the rows in.
    ///
    /// On failure the metric's previous rows are left untouched.
    pub async fn refresh_one(&self, spec: &MetricSpec) -> Result<usize, RefreshError> {
        let responses = executor::execute(spec, &self.client, Utc::now()).await?;
        let mut rows = projector::project(spec, &responses, &self.query)?;

        if !self.extra_label_values.is_empty() {
            for row in &mut rows {
                let mut labels =
                    Vec::with_capacity(self.extra_label_values.len() + row.labels.len());
                labels.extend(self.extra_label_values.iter().cloned());
                labels.append(&mut row.labels);
                row.labels = labels;
            }
        }

        let count = rows.len();
        self.store.replace_rows(spec.name(), rows).await;
        debug!(metric = spec.name(), rows = count, "metric refreshed");
        Ok(count)
    }

    /// Refresh every declared metric in order. A failing metric is logged
    /// and skipped; it never prevents the others from refreshing. Returns
    /// the number of failures.
    pub async fn refresh_all(&self) -> usize {
        let mut failures = 0;
        for spec in self.specs.iter() {
            if let Err(e) = self.refresh_one(spec).await {
                failures += 1;
                warn!(
                    metric = spec.name(),
                    error = %e,
                    "metric refresh failed; keeping last snapshot"
                );
            }
        }
        failures
    }
}
