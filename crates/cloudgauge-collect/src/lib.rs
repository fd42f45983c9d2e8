//! cloudgauge-collect — the collection pipeline.
//!
//! Executes the remote calls declared by `cloudgauge-spec` metrics, projects
//! the responses into flat rows, caches the latest rows per metric, and
//! renders them as Prometheus gauges.
//!
//! # Architecture
//!
//! ```text
//! Scheduler (global interval or one task per metric)
//!   └── Collector::refresh_one(spec)
//!         ├── executor::execute()   → remote calls (RemoteClient boundary)
//!         ├── projector::project()  → rows (QueryEval boundary, JMESPath)
//!         └── SnapshotStore::replace_rows()  ← atomic whole-list swap
//!
//! Scrape path (at any time, independently)
//!   └── render(specs, extra_labels, SnapshotStore::read_all())
//! ```
//!
//! A failed refresh leaves the metric's previous rows in place — a scraper
//! always gets the best available snapshot, never an error.

pub mod collector;
pub mod executor;
pub mod projector;
pub mod query;
pub mod remote;
pub mod render;
pub mod replay;
pub mod scheduler;
pub mod snapshot;

pub use collector::{Collector, RefreshError};
pub use projector::{ProjectError, NULL_LABEL};
pub use query::{JmesPathEval, QueryError, QueryEval};
pub use remote::{FetchError, Paginator, RemoteClient, RemoteService};
pub use render::render;
pub use replay::ReplayClient;
pub use scheduler::Scheduler;
pub use snapshot::{Row, SnapshotStore};
