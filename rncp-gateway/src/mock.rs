//! In-memory transport for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::GatewayError;
use crate::transport::Transport;

#[derive(Debug, Clone)]
enum Route {
    /// Paginated listing; pages are 1-based, past the end is `[]`
    Pages(Vec<Value>),
    Record(Value),
    Error(GatewayError),
}

/// A request seen by the mock
#[derive(Debug, Clone)]
pub struct MockCall {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub token: String,
}

impl MockCall {
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Mock transport for testing.
///
/// Unknown paths answer `404`.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<MockCall>>,
    call_count: AtomicU32,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a paginated listing
    pub fn with_pages(self, path: &str, pages: Vec<Value>) -> Self {
        self.route(path, Route::Pages(pages));
        self
    }

    /// Serve the same body for every request
    pub fn with_record(self, path: &str, body: Value) -> Self {
        self.route(path, Route::Record(body));
        self
    }

    /// Fail every request
    pub fn with_error(self, path: &str, error: GatewayError) -> Self {
        self.route(path, Route::Error(error));
        self
    }

    /// Replace the body served for `path`
    pub fn set_record(&self, path: &str, body: Value) {
        self.route(path, Route::Record(body));
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn route(&self, path: &str, route: Route) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), route);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, query: &[(String, String)], token: &str) -> Result<Value, GatewayError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let call = MockCall {
            path: path.to_string(),
            query: query.to_vec(),
            token: token.to_string(),
        };
        let page = call
            .query_value("page[number]")
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(1);
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);

        let route = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned();

        match route {
            Some(Route::Pages(pages)) => Ok(pages
                .get(page.saturating_sub(1))
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new()))),
            Some(Route::Record(body)) => Ok(body),
            Some(Route::Error(error)) => Err(error),
            None => Err(GatewayError::Upstream {
                status: 404,
                body: format!("no route for {path}"),
            }),
        }
    }
}
