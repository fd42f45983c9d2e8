//! The validated metric specification model.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::args::ArgsExpr;

/// Default refresh cadence when `update_freq_mins` is not given.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Which call protocol a metric uses, with the remote operation name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// Drive a paginator bound to this operation until it signals completion.
    Paginator(String),
    /// Invoke the operation directly, following `NextToken` continuations.
    Method(String),
}

impl CallKind {
    /// The remote operation name, regardless of protocol.
    pub fn operation(&self) -> &str {
        match self {
            CallKind::Paginator(op) | CallKind::Method(op) => op,
        }
    }

    /// Whether this call uses the paginated protocol.
    pub fn is_paginated(&self) -> bool {
        matches!(self, CallKind::Paginator(_))
    }
}

/// Arguments passed to the remote operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Arguments {
    /// A literal JSON mapping, passed verbatim.
    Static(Map<String, Value>),
    /// A parsed date-arithmetic expression, bound to the clock per refresh.
    Expr(ArgsExpr),
}

impl Arguments {
    /// Materialize the argument mapping, binding `now` to the given instant.
    pub fn materialize_at(&self, now: DateTime<Utc>) -> Map<String, Value> {
        match self {
            Arguments::Static(map) => map.clone(),
            Arguments::Expr(expr) => expr.eval_at(now),
        }
    }
}

impl Default for Arguments {
    fn default() -> Self {
        Arguments::Static(Map::new())
    }
}

/// One declared metric: a remote API call and the gauge it projects into.
///
/// Constructed only by the parser, immutable for the process lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSpec {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) service: String,
    pub(crate) call: CallKind,
    pub(crate) arguments: Arguments,
    pub(crate) search: String,
    pub(crate) label_names: Vec<String>,
    pub(crate) refresh_interval: Duration,
}

impl MetricSpec {
    /// The exported series name (also the document key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The HELP text for the exported series.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The remote service identifier.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The call protocol and operation name.
    pub fn call(&self) -> &CallKind {
        &self.call
    }

    /// The declared operation arguments.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// The JMESPath projection expression.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// The ordered label schema (excluding process-wide extra labels).
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// How often this metric refreshes in per-metric scheduling mode.
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }
}
