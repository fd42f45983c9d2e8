//! cloudgauge-spec — declarative metric specifications.
//!
//! A metrics document is a YAML mapping from metric name to a description of
//! one remote API call: which service and operation to invoke, how to
//! paginate it, the JMESPath projection that flattens the response, and the
//! label schema of the exported gauge. This crate turns that document into
//! validated, immutable [`MetricSpec`] values.
//!
//! # Architecture
//!
//! ```text
//! parse_metrics(yaml)
//!   ├── name / field validation → SpecError (fatal at load time)
//!   ├── argument normalization
//!   │     ├── mapping → passed verbatim to the operation
//!   │     └── string → ArgsExpr AST ("StartTime = now - 4 weeks"),
//!   │         evaluated against the clock at each refresh
//!   └── ordered Vec<MetricSpec> (document declaration order)
//! ```

pub mod args;
pub mod error;
pub mod model;
pub mod parser;

pub use args::{ArgExpr, ArgsExpr};
pub use error::{SpecError, SpecResult};
pub use model::{Arguments, CallKind, MetricSpec};
pub use parser::parse_metrics;
