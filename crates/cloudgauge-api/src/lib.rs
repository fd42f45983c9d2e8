//! cloudgauge-api — HTTP surface for the exporter.
//!
//! Provides axum route handlers over the shared snapshot store. The scrape
//! path never touches the remote provider; it renders whatever the
//! collector last wrote.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition (text format 0.0.4) |
//! | GET | `/healthz` | Liveness probe |
//! | GET | `/api/v1/specs` | Loaded metric declarations |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use cloudgauge_collect::SnapshotStore;
use cloudgauge_spec::MetricSpec;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct ApiState {
    pub specs: Arc<Vec<MetricSpec>>,
    pub extra_label_names: Vec<String>,
    pub store: SnapshotStore,
}

/// Build the complete router (scrape endpoint + introspection API).
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/specs", get(handlers::list_specs))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::prometheus_metrics).with_state(state))
}
