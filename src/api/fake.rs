//! Canned transport for unit tests.

use super::error::ApiError;
use super::transport::{ApiCall, Method, Payload, Transport};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Route {
    method: Method,
    path: String,
    reply: Result<Vec<u8>, ApiError>,
    delay: Option<Duration>,
}

#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<ApiCall>>,
}

fn norm(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: Method, path: &str, reply: Result<Vec<u8>, ApiError>, delay: Option<Duration>) {
        self.routes.lock().unwrap().push(Route {
            method,
            path: norm(path),
            reply,
            delay,
        });
    }

    /// Later registrations for the same route win.
    pub fn on(&self, method: Method, path: &str, body: Value) {
        self.push(method, path, Ok(serde_json::to_vec(&body).unwrap()), None);
    }

    pub fn on_delayed(&self, method: Method, path: &str, body: Value, delay: Duration) {
        self.push(method, path, Ok(serde_json::to_vec(&body).unwrap()), Some(delay));
    }

    pub fn on_bytes(&self, method: Method, path: &str, bytes: &[u8]) {
        self.push(method, path, Ok(bytes.to_vec()), None);
    }

    pub fn fail(&self, method: Method, path: &str, err: ApiError) {
        self.push(method, path, Err(err), None);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> Vec<ApiCall> {
        let path = norm(path);
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && norm(&c.path) == path)
            .collect()
    }
}

impl Transport for FakeTransport {
    fn send(&self, call: &ApiCall, _token: Option<&str>) -> Result<Payload, ApiError> {
        self.calls.lock().unwrap().push(call.clone());
        let path = norm(&call.path);
        let (reply, delay) = {
            let routes = self.routes.lock().unwrap();
            match routes
                .iter()
                .rev()
                .find(|r| r.method == call.method && r.path == path)
            {
                Some(r) => (r.reply.clone(), r.delay),
                None => (
                    Err(ApiError::Server {
                        status: 404,
                        message: Some(format!("no route for {path}")),
                    }),
                    None,
                ),
            }
        };
        if let Some(d) = delay {
            std::thread::sleep(d);
        }
        reply.map(|bytes| Payload {
            content_type: Some("application/json".to_string()),
            bytes,
        })
    }
}
