//! Replay client — serves canned response documents from a fixtures tree.
//!
//! Layout: `<root>/<service>/<operation>.json`. A file holding a JSON array
//! is consumed one element at a time (one per page for the paginated
//! protocol, one per call for the cursor loop); a single JSON object is a
//! one-shot response. Successive cursor-loop calls past the end of the
//! script keep returning the final document.
//!
//! This stands in for the out-of-scope production client: it implements the
//! same boundary traits, which makes the whole serve path exercisable in
//! integration tests and local runs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::remote::{FetchError, FetchResult, Paginator, RemoteClient, RemoteService};

/// Fixture-backed [`RemoteClient`].
#[derive(Clone)]
pub struct ReplayClient {
    root: PathBuf,
    /// Per `service/operation` call cursor for the cursor-loop protocol.
    cursors: Arc<Mutex<HashMap<String, usize>>>,
}

impl ReplayClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cursors: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl RemoteClient for ReplayClient {
    type Service = ReplayService;

    fn service(&self, name: &str) -> FetchResult<Self::Service> {
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(FetchError::UnknownService(name.to_string()));
        }
        Ok(ReplayService {
            name: name.to_string(),
            dir,
            cursors: self.cursors.clone(),
        })
    }
}

pub struct ReplayService {
    name: String,
    dir: PathBuf,
    cursors: Arc<Mutex<HashMap<String, usize>>>,
}

impl ReplayService {
    /// Load the fixture script for one operation.
    fn documents(&self, operation: &str) -> FetchResult<Vec<Value>> {
        let path = self.dir.join(format!("{operation}.json"));
        if !path.is_file() {
            return Err(FetchError::UnknownOperation {
                service: self.name.clone(),
                operation: operation.to_string(),
            });
        }
        let transport = |message: String| FetchError::Transport {
            service: self.name.clone(),
            operation: operation.to_string(),
            message,
        };
        let raw = std::fs::read_to_string(&path).map_err(|e| transport(e.to_string()))?;
        let parsed: Value = serde_json::from_str(&raw).map_err(|e| transport(e.to_string()))?;
        match parsed {
            Value::Array(docs) if docs.is_empty() => {
                Err(transport("fixture script is empty".to_string()))
            }
            Value::Array(docs) => Ok(docs),
            single => Ok(vec![single]),
        }
    }
}

impl RemoteService for ReplayService {
    type Paginator = ReplayPaginator;

    async fn call(&self, operation: &str, _args: &Map<String, Value>) -> FetchResult<Value> {
        let docs = self.documents(operation)?;
        let key = format!("{}/{operation}", self.name);
        let mut cursors = self.cursors.lock().expect("replay cursor lock");
        let index = cursors.entry(key).or_insert(0);
        let doc = docs[(*index).min(docs.len() - 1)].clone();
        *index += 1;
        Ok(doc)
    }

    fn paginator(&self, operation: &str) -> FetchResult<Self::Paginator> {
        Ok(ReplayPaginator {
            docs: self.documents(operation)?,
            pos: 0,
        })
    }
}

pub struct ReplayPaginator {
    docs: Vec<Value>,
    pos: usize,
}

impl Paginator for ReplayPaginator {
    async fn next_page(&mut self, _args: &Map<String, Value>) -> FetchResult<Option<Value>> {
        let page = self.docs.get(self.pos).cloned();
        self.pos += 1;
        Ok(page)
    }
}
