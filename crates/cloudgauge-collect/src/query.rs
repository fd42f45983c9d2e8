//! The projection expression boundary.
//!
//! A [`QueryEval`] reduces an arbitrary nested response document into a
//! JSON value — for metric projections, a list of flat records. The default
//! implementation evaluates JMESPath expressions.

use serde_json::Value;
use thiserror::Error;

/// A projection expression failed to compile or evaluate.
#[derive(Debug, Error)]
#[error("query '{expr}' failed: {message}")]
pub struct QueryError {
    pub expr: String,
    pub message: String,
}

/// Evaluates a projection expression against a JSON document.
pub trait QueryEval: Send + Sync {
    fn evaluate(&self, expr: &str, data: &Value) -> Result<Value, QueryError>;
}

/// JMESPath-backed evaluator.
///
/// Expressions are compiled per evaluation; at refresh cadence (minutes)
/// compilation cost is irrelevant and nothing non-`Send` is held across
/// await points.
#[derive(Clone, Copy, Debug, Default)]
pub struct JmesPathEval;

impl QueryEval for JmesPathEval {
    fn evaluate(&self, expr: &str, data: &Value) -> Result<Value, QueryError> {
        let err = |message: String| QueryError {
            expr: expr.to_string(),
            message,
        };
        let compiled = jmespath::compile(expr).map_err(|e| err(e.to_string()))?;
        let input =
            jmespath::Variable::from_serializable(data).map_err(|e| err(e.to_string()))?;
        let result = compiled.search(input).map_err(|e| err(e.to_string()))?;
        serde_json::to_value(&*result).map_err(|e| err(e.to_string()))
    }
}
