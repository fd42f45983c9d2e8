//! Metrics document parsing and validation.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::{Map, Value};
use serde_yaml::Value as Yaml;

use crate::args::ArgsExpr;
use crate::error::{SpecError, SpecResult};
use crate::model::{Arguments, CallKind, MetricSpec, DEFAULT_REFRESH_INTERVAL};

static METRIC_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-z_0-9]+$").expect("valid metric name regex"));

/// Parse a YAML metrics document into validated specs, in declaration order.
///
/// Parsing is pure: the same document always yields the same specs. Dynamic
/// argument expressions are stored as ASTs and bound to the clock at refresh
/// time, not here.
pub fn parse_metrics(document: &str) -> SpecResult<Vec<MetricSpec>> {
    let root: Yaml =
        serde_yaml::from_str(document).map_err(|e| SpecError::Document(e.to_string()))?;
    let mapping = root.as_mapping().ok_or(SpecError::NotAMapping)?;

    let mut specs: Vec<MetricSpec> = Vec::with_capacity(mapping.len());
    for (key, body) in mapping {
        let name = key
            .as_str()
            .ok_or_else(|| SpecError::InvalidName(format!("{key:?}")))?;
        if !METRIC_NAME_RE.is_match(name) {
            return Err(SpecError::InvalidName(name.to_string()));
        }
        if specs.iter().any(|s| s.name == name) {
            return Err(SpecError::DuplicateName(name.to_string()));
        }
        // Field order within one metric body does not matter, so the body is
        // converted to JSON up front; only document-level declaration order
        // is significant.
        let body: Value = serde_json::to_value(body)
            .map_err(|e| SpecError::Document(format!("metric '{name}': {e}")))?;
        specs.push(parse_one(name, &body)?);
    }
    Ok(specs)
}

fn parse_one(name: &str, body: &Value) -> SpecResult<MetricSpec> {
    let body: &Map<String, Value> = body
        .as_object()
        .ok_or_else(|| SpecError::bad_field(name, name, "mapping"))?;

    let description = require_str(name, "description", body.get("description"))?;
    let service = require_str(name, "service", body.get("service"))?;
    let search = require_str(name, "search", body.get("search"))?;

    let call = match (body.get("paginator"), body.get("method")) {
        (Some(_), Some(_)) => return Err(SpecError::AmbiguousOperation(name.to_string())),
        (Some(op), None) => CallKind::Paginator(require_str(name, "paginator", Some(op))?),
        (None, Some(op)) => CallKind::Method(require_str(name, "method", Some(op))?),
        (None, None) => return Err(SpecError::NoOperation(name.to_string())),
    };
    let args_field = if call.is_paginated() {
        "paginator_args"
    } else {
        "method_args"
    };
    let arguments = parse_arguments(name, body.get(args_field))?;

    let label_names = parse_label_names(name, body.get("label_names"))?;
    let refresh_interval = parse_interval(name, body.get("update_freq_mins"))?;

    Ok(MetricSpec {
        name: name.to_string(),
        description,
        service,
        call,
        arguments,
        search,
        label_names,
        refresh_interval,
    })
}

fn require_str(metric: &str, field: &str, value: Option<&Value>) -> SpecResult<String> {
    let value = value.ok_or_else(|| SpecError::missing(metric, field))?;
    let s = value
        .as_str()
        .ok_or_else(|| SpecError::bad_field(metric, field, "string"))?
        .trim();
    if s.is_empty() {
        return Err(SpecError::bad_field(metric, field, "string"));
    }
    Ok(s.to_string())
}

fn parse_arguments(metric: &str, value: Option<&Value>) -> SpecResult<Arguments> {
    let bad = |reason: String| SpecError::BadArguments {
        metric: metric.to_string(),
        reason,
    };
    match value {
        None => Ok(Arguments::default()),
        Some(Value::Object(map)) => Ok(Arguments::Static(map.clone())),
        Some(Value::String(expr)) => ArgsExpr::parse(expr).map(Arguments::Expr).map_err(bad),
        Some(_) => Err(bad(
            "arguments must be a mapping or an expression string".to_string(),
        )),
    }
}

fn parse_label_names(metric: &str, value: Option<&Value>) -> SpecResult<Vec<String>> {
    let value = value.ok_or_else(|| SpecError::missing(metric, "label_names"))?;
    // An explicitly empty list is valid (legacy set-membership documents).
    let seq = value
        .as_array()
        .ok_or_else(|| SpecError::bad_field(metric, "label_names", "list of strings"))?;
    seq.iter()
        .map(|v| {
            v.as_str()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| SpecError::bad_field(metric, "label_names", "list of strings"))
        })
        .collect()
}

fn parse_interval(metric: &str, value: Option<&Value>) -> SpecResult<Duration> {
    match value {
        None => Ok(DEFAULT_REFRESH_INTERVAL),
        Some(v) => {
            // No minimum is enforced; a sub-minute interval is the caller's risk.
            let mins = v
                .as_f64()
                .filter(|m| *m >= 0.0)
                .ok_or_else(|| SpecError::bad_field(metric, "update_freq_mins", "number"))?;
            Duration::try_from_secs_f64(mins * 60.0)
                .map_err(|_| SpecError::bad_field(metric, "update_freq_mins", "number"))
        }
    }
}
