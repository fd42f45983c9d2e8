//! Projection — reduces raw response documents to exportable rows.

use serde_json::Value;
use thiserror::Error;

use cloudgauge_spec::MetricSpec;

use crate::query::{QueryError, QueryEval};
use crate::snapshot::Row;

/// Sentinel substituted for an explicit `null` label value. The empty
/// string is a legitimate label value and is never converted.
pub const NULL_LABEL: &str = "<null>";

/// The projection result did not have the shape the metric declares.
///
/// Recovered per metric: the Collector logs it and keeps the last-good
/// snapshot, exactly like a fetch failure.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Eval(#[from] QueryError),

    #[error("metric '{metric}': {reason}")]
    Shape { metric: String, reason: String },

    #[error("metric '{metric}': {reason}")]
    Value { metric: String, reason: String },
}

/// Evaluate the metric's projection against every response document in
/// order and validate the concatenated records into rows.
///
/// The expression runs once per document — a page for the paginated
/// protocol, a call response for the cursor loop — and the per-document
/// record lists concatenate in document order, so row order equals
/// projected-record order across the whole call.
pub fn project<Q: QueryEval>(
    spec: &MetricSpec,
    responses: &[Value],
    query: &Q,
) -> Result<Vec<Row>, ProjectError> {
    let shape = |reason: String| ProjectError::Shape {
        metric: spec.name().to_string(),
        reason,
    };

    let mut rows = Vec::new();
    for response in responses {
        let projected = query.evaluate(spec.search(), response)?;
        let records = match projected {
            // A path that matches nothing is an empty result, not an error.
            Value::Null => continue,
            Value::Array(records) => records,
            other => {
                return Err(shape(format!(
                    "projection must yield a list of records, got {}",
                    json_kind(&other)
                )))
            }
        };
        for record in &records {
            rows.push(record_to_row(spec, record)?);
        }
    }
    Ok(rows)
}

fn record_to_row(spec: &MetricSpec, record: &Value) -> Result<Row, ProjectError> {
    let shape = |reason: String| ProjectError::Shape {
        metric: spec.name().to_string(),
        reason,
    };
    let value_err = |reason: String| ProjectError::Value {
        metric: spec.name().to_string(),
        reason,
    };

    let record = record
        .as_object()
        .ok_or_else(|| shape(format!("projected record is not a mapping: {record}")))?;

    let value = record
        .get("value")
        .ok_or_else(|| value_err(format!("record is missing a 'value' field: {record:?}")))?
        .as_f64()
        .ok_or_else(|| value_err("the 'value' field must be a number".to_string()))?;

    let mut labels = Vec::with_capacity(spec.label_names().len());
    for name in spec.label_names() {
        // A declared label field absent from a record is fatal for the
        // metric; extra fields the schema does not name are ignored.
        let raw = record
            .get(name)
            .ok_or_else(|| shape(format!("record is missing label field '{name}'")))?;
        labels.push(label_value(raw).map_err(shape)?);
    }

    Ok(Row::new(labels, value))
}

fn label_value(raw: &Value) -> Result<String, String> {
    match raw {
        Value::Null => Ok(NULL_LABEL.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        composite => Err(format!("label value must be a scalar, got {}", json_kind(composite))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
