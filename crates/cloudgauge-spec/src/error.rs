//! Error types for metrics-document parsing.

use thiserror::Error;

/// Result type alias for spec parsing.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors raised while parsing a metrics document.
///
/// All of these are fatal at load time: the daemon refuses to start serving
/// with an invalid spec set.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("metrics document is not valid YAML: {0}")]
    Document(String),

    #[error("metrics document must be a mapping of metric name to spec")]
    NotAMapping,

    #[error("metric name '{0}' does not match ^[a-z_0-9]+$")]
    InvalidName(String),

    #[error("duplicate metric name '{0}'")]
    DuplicateName(String),

    #[error("metric '{metric}' is missing mandatory field '{field}'")]
    MissingField { metric: String, field: String },

    #[error("metric '{metric}' field '{field}' must be a non-empty {expected}")]
    BadField {
        metric: String,
        field: String,
        expected: &'static str,
    },

    #[error("metric '{0}' must have either a 'paginator' or a 'method' field")]
    NoOperation(String),

    #[error("metric '{0}' has both 'paginator' and 'method' fields")]
    AmbiguousOperation(String),

    #[error("metric '{metric}' has invalid arguments: {reason}")]
    BadArguments { metric: String, reason: String },
}

impl SpecError {
    pub(crate) fn missing(metric: &str, field: &str) -> Self {
        SpecError::MissingField {
            metric: metric.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn bad_field(metric: &str, field: &str, expected: &'static str) -> Self {
        SpecError::BadField {
            metric: metric.to_string(),
            field: field.to_string(),
            expected,
        }
    }
}
