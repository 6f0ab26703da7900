//! Recording in-process vendor client
//!
//! Responses are queued per `(method, path)`; the last queued response for a
//! route keeps answering once the queue drains. Unrouted calls answer 404.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::client::{HttpMethod, VendorClient, VendorError};

pub type MockResponse = std::result::Result<Value, VendorError>;

/// A call the mock received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub token: String,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Default)]
pub struct MockVendorClient {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<MockResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Option<Duration>,
}

impl MockVendorClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer, to widen race windows in tests
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a response for a route
    pub fn on(&self, method: HttpMethod, path: impl Into<String>, response: MockResponse) -> &Self {
        self.routes
            .lock()
            .entry((method, path.into()))
            .or_default()
            .push_back(response);
        self
    }

    pub fn ok(&self, method: HttpMethod, path: impl Into<String>, body: Value) -> &Self {
        self.on(method, path, Ok(body))
    }

    pub fn fail(&self, method: HttpMethod, path: impl Into<String>, error: VendorError) -> &Self {
        self.on(method, path, Err(error))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls whose path (query string included) equals `path`
    pub fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.path == path).count()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().last().cloned()
    }

    fn answer(&self, method: HttpMethod, path: &str) -> MockResponse {
        let mut routes = self.routes.lock();
        match routes.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(VendorError::status(404, None))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(VendorError::status(404, None))),
            None => Err(VendorError::status(404, None)),
        }
    }
}

#[async_trait]
impl VendorClient for MockVendorClient {
    async fn call_with_headers(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        token: &str,
        headers: &[(&str, &str)],
    ) -> Result<Value, VendorError> {
        self.calls.lock().push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
            token: token.to_string(),
            headers: headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.answer(method, path)
    }
}
