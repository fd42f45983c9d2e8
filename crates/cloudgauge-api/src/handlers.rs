//! HTTP handlers.
//!
//! Each handler reads from the shared snapshot store and returns either
//! Prometheus text or JSON.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use cloudgauge_collect::render;
use cloudgauge_spec::MetricSpec;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.store.read_all().await;
    let body = render(&state.specs, &state.extra_label_names, &snapshot);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

// ── Liveness ───────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// ── Introspection ──────────────────────────────────────────────

/// One loaded metric declaration, as reported by `/api/v1/specs`.
#[derive(serde::Serialize)]
pub struct SpecSummary {
    pub name: String,
    pub description: String,
    pub service: String,
    pub operation: String,
    pub paginated: bool,
    pub search: String,
    pub label_names: Vec<String>,
    pub refresh_interval_secs: u64,
}

impl From<&MetricSpec> for SpecSummary {
    fn from(spec: &MetricSpec) -> Self {
        Self {
            name: spec.name().to_string(),
            description: spec.description().to_string(),
            service: spec.service().to_string(),
            operation: spec.call().operation().to_string(),
            paginated: spec.call().is_paginated(),
            search: spec.search().to_string(),
            label_names: spec.label_names().to_vec(),
            refresh_interval_secs: spec.refresh_interval().as_secs(),
        }
    }
}

/// GET /api/v1/specs
pub async fn list_specs(State(state): State<ApiState>) -> impl IntoResponse {
    let summaries: Vec<SpecSummary> = state.specs.iter().map(SpecSummary::from).collect();
    ApiResponse::ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cloudgauge_collect::{Row, SnapshotStore};
    use cloudgauge_spec::parse_metrics;

    const SPECS_YAML: &str = r#"
queue_depth:
  description: Messages waiting per queue
  service: sqs
  paginator: list_queues
  search: "Queues[].{value: Depth, queue: Name}"
  label_names: [queue]
"#;

    async fn test_state() -> ApiState {
        let specs = Arc::new(parse_metrics(SPECS_YAML).unwrap());
        let store = SnapshotStore::new(specs.iter().map(|s| s.name().to_string()));
        store
            .replace_rows(
                "queue_depth",
                vec![Row::new(vec!["prod".into(), "jobs".into()], 7.0)],
            )
            .await;
        ApiState {
            specs,
            extra_label_names: vec!["account".to_string()],
            store,
        }
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_exposition_text() {
        let state = test_state().await;
        let resp = prometheus_metrics(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert_eq!(content_type, "text/plain; version=0.0.4; charset=utf-8");

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("# TYPE queue_depth gauge"));
        assert!(text.contains(r#"queue_depth{account="prod",queue="jobs"} 7"#));
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let resp = healthz().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn specs_endpoint_lists_declarations() {
        let state = test_state().await;
        let resp = list_specs(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"][0]["name"], "queue_depth");
        assert_eq!(json["data"][0]["service"], "sqs");
        assert_eq!(json["data"][0]["paginated"], true);
        assert_eq!(json["data"][0]["refresh_interval_secs"], 300);
    }
}
