//! Prometheus text exposition (format 0.0.4).
//!
//! Renders the current snapshot for scraping. Every declared metric emits
//! its HELP and TYPE lines even with zero rows — "no matching resources
//! this cycle" is a valid, expected state.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use cloudgauge_spec::MetricSpec;

use crate::snapshot::Row;

/// Render every declared metric, in declaration order, as a gauge family.
///
/// `extra_label_names` are the process-wide labels whose values the
/// Collector prepends to each row; they come first in each sample's label
/// set, followed by the metric's own `label_names`.
pub fn render(
    specs: &[MetricSpec],
    extra_label_names: &[String],
    snapshot: &HashMap<String, Arc<Vec<Row>>>,
) -> String {
    let mut out = String::new();
    for spec in specs {
        let _ = writeln!(out, "# HELP {} {}", spec.name(), escape_help(spec.description()));
        let _ = writeln!(out, "# TYPE {} gauge", spec.name());

        let label_names: Vec<&str> = extra_label_names
            .iter()
            .chain(spec.label_names())
            .map(String::as_str)
            .collect();

        let Some(rows) = snapshot.get(spec.name()) else {
            continue;
        };
        for row in rows.iter() {
            out.push_str(spec.name());
            if !label_names.is_empty() {
                out.push('{');
                for (i, (name, value)) in label_names.iter().zip(&row.labels).enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{name}=\"{}\"", escape_label(value));
                }
                out.push('}');
            }
            let _ = writeln!(out, " {}", row.value);
        }
    }
    out
}

fn escape_help(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
