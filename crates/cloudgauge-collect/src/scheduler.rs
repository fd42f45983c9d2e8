//! Scheduling — drives refresh cycles until shutdown.
//!
//! Two mutually exclusive modes per deployment:
//!
//! - **global** (recommended): one shared interval triggers a full
//!   `refresh_all` cycle. Simpler failure reasoning, and the whole snapshot
//!   advances together.
//! - **per-metric**: one task per spec, each on its own `refresh_interval`.
//!   Different metrics may refresh concurrently; a metric never overlaps
//!   itself because the next tick is armed only after its refresh returns.
//!
//! There is no cancellation: an in-flight refresh runs to completion or
//! failure, and shutdown is observed between cycles (best-effort).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::collector::Collector;
use crate::query::QueryEval;
use crate::remote::RemoteClient;

/// Drives a [`Collector`] on a refresh cadence.
pub struct Scheduler<C, Q> {
    collector: Arc<Collector<C, Q>>,
}

impl<C, Q> Scheduler<C, Q>
where
    C: RemoteClient + 'static,
    Q: QueryEval + 'static,
{
    pub fn new(collector: Arc<Collector<C, Q>>) -> Self {
        Self { collector }
    }

    /// Global mode: refresh every metric on one shared interval, ignoring
    /// the specs' individual `refresh_interval`s. Runs until shutdown.
    pub async fn run_global(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = interval.as_secs(), "scheduler started (global mode)");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let failures = self.collector.refresh_all().await;
                    if failures > 0 {
                        warn!(failures, "refresh cycle completed with failures");
                    }
                }
                _ = shutdown.changed() => {
                    info!("scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// Per-metric mode: spawn one refresh task per spec, each driven by the
    /// spec's own interval. Returns the task handles; tasks stop when the
    /// shutdown channel fires.
    pub fn spawn_per_metric(&self, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        info!(
            metrics = self.collector.specs().len(),
            "scheduler started (per-metric mode)"
        );
        self.collector
            .specs()
            .iter()
            .cloned()
            .map(|spec| {
                let collector = self.collector.clone();
                let mut shutdown = shutdown.clone();
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            _ = tokio::time::sleep(spec.refresh_interval()) => {
                                // The next tick is armed only after this
                                // refresh returns, so a slow upstream can
                                // delay this metric but never overlap it.
                                if let Err(e) = collector.refresh_one(&spec).await {
                                    warn!(
                                        metric = spec.name(),
                                        error = %e,
                                        "metric refresh failed; keeping last snapshot"
                                    );
                                }
                            }
                            _ = shutdown.changed() => break,
                        }
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{json, Map, Value};

    use cloudgauge_spec::parse_metrics;

    use crate::query::JmesPathEval;
    use crate::remote::{FetchResult, Paginator, RemoteService};

    #[derive(Clone)]
    struct CountingClient {
        calls: Arc<std::sync::Mutex<u64>>,
    }

    impl RemoteClient for CountingClient {
        type Service = CountingClient;

        fn service(&self, _name: &str) -> FetchResult<Self::Service> {
            Ok(self.clone())
        }
    }

    impl RemoteService for CountingClient {
        type Paginator = NoPages;

        async fn call(&self, _operation: &str, _args: &Map<String, Value>) -> FetchResult<Value> {
            *self.calls.lock().unwrap() += 1;
            Ok(json!({"Items": [{"id": "x", "value": 1}]}))
        }

        fn paginator(&self, _operation: &str) -> FetchResult<Self::Paginator> {
            Ok(NoPages)
        }
    }

    struct NoPages;

    impl Paginator for NoPages {
        async fn next_page(&mut self, _args: &Map<String, Value>) -> FetchResult<Option<Value>> {
            Ok(None)
        }
    }

    fn collector(calls: Arc<std::sync::Mutex<u64>>) -> Arc<Collector<CountingClient, JmesPathEval>> {
        let specs = parse_metrics(
            "fast_metric:\n  description: d\n  service: s\n  method: op\n  label_names: [id]\n  search: \"Items[]\"\n  update_freq_mins: 0\n",
        )
        .unwrap();
        Arc::new(Collector::new(
            Arc::new(specs),
            CountingClient { calls },
            JmesPathEval,
            vec![],
        ))
    }

    #[tokio::test]
    async fn global_mode_refreshes_until_shutdown() {
        let calls = Arc::new(std::sync::Mutex::new(0));
        let scheduler = Scheduler::new(collector(calls.clone()));
        let (tx, rx) = watch::channel(false);

        let handle = {
            let rx = rx.clone();
            tokio::spawn(async move {
                scheduler.run_global(Duration::from_millis(5), rx).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(60)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(*calls.lock().unwrap() >= 1, "at least one refresh cycle ran");
    }

    #[tokio::test]
    async fn per_metric_mode_stops_on_shutdown() {
        let calls = Arc::new(std::sync::Mutex::new(0));
        let scheduler = Scheduler::new(collector(calls.clone()));
        let (tx, rx) = watch::channel(false);

        let handles = scheduler.spawn_per_metric(&rx);
        assert_eq!(handles.len(), 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(*calls.lock().unwrap() >= 1);
    }
}
