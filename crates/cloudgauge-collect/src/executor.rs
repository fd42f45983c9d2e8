//! Call execution — drives one metric's remote call protocol to completion.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use cloudgauge_spec::{CallKind, MetricSpec};

use crate::remote::{FetchResult, Paginator, RemoteClient, RemoteService};

/// The continuation-token field of the cursor-loop protocol.
pub const CURSOR_TOKEN_FIELD: &str = "NextToken";

/// Execute a metric's remote call, returning every raw response document in
/// order (pages for the paginated protocol, per-call responses for the
/// cursor loop). `now` binds any dynamic argument expressions.
pub async fn execute<C: RemoteClient>(
    spec: &MetricSpec,
    client: &C,
    now: DateTime<Utc>,
) -> FetchResult<Vec<Value>> {
    let args = spec.arguments().materialize_at(now);
    let service = client.service(spec.service())?;

    match spec.call() {
        CallKind::Paginator(operation) => {
            let mut pager = service.paginator(operation)?;
            let mut pages = Vec::new();
            while let Some(page) = pager.next_page(&args).await? {
                pages.push(page);
            }
            Ok(pages)
        }
        CallKind::Method(operation) => cursor_loop(&service, operation, args).await,
    }
}

/// Invoke an operation, following `NextToken` continuations until the
/// response carries none (or an empty one).
async fn cursor_loop<S: RemoteService>(
    service: &S,
    operation: &str,
    mut args: Map<String, Value>,
) -> FetchResult<Vec<Value>> {
    let mut responses = Vec::new();
    loop {
        let response = service.call(operation, &args).await?;
        let token = cursor_token(&response);
        responses.push(response);
        match token {
            Some(token) => {
                args.insert(CURSOR_TOKEN_FIELD.to_string(), Value::String(token));
            }
            None => return Ok(responses),
        }
    }
}

fn cursor_token(response: &Value) -> Option<String> {
    response
        .get(CURSOR_TOKEN_FIELD)
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use cloudgauge_spec::parse_metrics;

    use crate::remote::FetchError;

    /// Scripted client: serves a fixed sequence of documents per operation
    /// and records each call's arguments.
    #[derive(Clone, Default)]
    struct ScriptedClient {
        docs: Vec<Value>,
        calls: Arc<Mutex<Vec<Map<String, Value>>>>,
        fail: bool,
    }

    impl ScriptedClient {
        fn new(docs: Vec<Value>) -> Self {
            Self {
                docs,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Map<String, Value>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RemoteClient for ScriptedClient {
        type Service = ScriptedClient;

        fn service(&self, name: &str) -> FetchResult<Self::Service> {
            if self.fail {
                return Err(FetchError::UnknownService(name.to_string()));
            }
            Ok(self.clone())
        }
    }

    impl RemoteService for ScriptedClient {
        type Paginator = ScriptedPaginator;

        async fn call(&self, operation: &str, args: &Map<String, Value>) -> FetchResult<Value> {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.len();
            calls.push(args.clone());
            self.docs.get(index).cloned().ok_or(FetchError::Transport {
                service: "test".into(),
                operation: operation.into(),
                message: "script exhausted".into(),
            })
        }

        fn paginator(&self, _operation: &str) -> FetchResult<Self::Paginator> {
            Ok(ScriptedPaginator {
                docs: self.docs.clone(),
                pos: 0,
                calls: self.calls.clone(),
            })
        }
    }

    struct ScriptedPaginator {
        docs: Vec<Value>,
        pos: usize,
        calls: Arc<Mutex<Vec<Map<String, Value>>>>,
    }

    impl Paginator for ScriptedPaginator {
        async fn next_page(&mut self, args: &Map<String, Value>) -> FetchResult<Option<Value>> {
            self.calls.lock().unwrap().push(args.clone());
            let page = self.docs.get(self.pos).cloned();
            self.pos += 1;
            Ok(page)
        }
    }

    fn paginated_spec() -> MetricSpec {
        let doc = r#"
pages_metric:
  description: d
  service: ec2
  paginator: describe_instances
  paginator_args:
    Filters: [x]
  label_names: [id]
  search: "[]"
"#;
        parse_metrics(doc).unwrap().remove(0)
    }

    fn cursor_spec() -> MetricSpec {
        let doc = r#"
cursor_metric:
  description: d
  service: ssm
  method: describe_parameters
  method_args:
    MaxResults: 50
  label_names: [name]
  search: "Parameters[]"
"#;
        parse_metrics(doc).unwrap().remove(0)
    }

    #[tokio::test]
    async fn paginated_collects_all_pages_in_order() {
        let pages = vec![json!([{"id": "a"}]), json!([{"id": "b"}])];
        let client = ScriptedClient::new(pages.clone());

        let got = execute(&paginated_spec(), &client, Utc::now()).await.unwrap();
        assert_eq!(got, pages);
        // Two pages plus the final empty probe.
        assert_eq!(client.calls().len(), 3);
    }

    #[tokio::test]
    async fn cursor_loop_merges_token_and_stops() {
        let docs = vec![
            json!({"Parameters": [{"name": "p1"}], "NextToken": "123abc"}),
            json!({"Parameters": [{"name": "p2"}]}),
        ];
        let client = ScriptedClient::new(docs.clone());

        let got = execute(&cursor_spec(), &client, Utc::now()).await.unwrap();
        assert_eq!(got, docs);

        let calls = client.calls();
        // Exactly two invocations: no third call after the token disappears.
        assert_eq!(calls.len(), 2);
        assert!(!calls[0].contains_key("NextToken"));
        assert_eq!(calls[1]["NextToken"], json!("123abc"));
        // Original arguments are preserved alongside the merged token.
        assert_eq!(calls[1]["MaxResults"], json!(50));
    }

    #[tokio::test]
    async fn empty_token_terminates_the_loop() {
        let docs = vec![json!({"Parameters": [], "NextToken": ""})];
        let client = ScriptedClient::new(docs);

        let got = execute(&cursor_spec(), &client, Utc::now()).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn transport_error_aborts_execution() {
        let client = ScriptedClient {
            fail: true,
            ..ScriptedClient::default()
        };
        let err = execute(&cursor_spec(), &client, Utc::now()).await.unwrap_err();
        assert!(matches!(err, FetchError::UnknownService(_)));
    }
}
