#![allow(dead_code)]

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// A mock portal API. The server is declared first so it drops while the
/// runtime is still alive.
pub struct Portal {
    pub server: MockServer,
    rt: Runtime,
}

impl Portal {
    pub fn start() -> Self {
        let rt = Runtime::new().expect("tokio runtime");
        let server = rt.block_on(MockServer::start());
        Portal { server, rt }
    }

    pub fn api_base_url(&self) -> String {
        format!("{}/api", self.server.uri())
    }

    pub fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    pub fn received(&self, verb: &str, p: &str) -> Vec<wiremock::Request> {
        self.rt
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == verb && r.url.path() == p)
            .collect()
    }

    /// Staff or student login answering with the given role.
    pub fn mount_login(&self, role: &str, name: &str) {
        let (route, body) = if role == "student" {
            (
                "/api/student/login",
                json!({ "token": "tok-student", "student": { "id": 41, "first_name": name, "last_name": "" } }),
            )
        } else {
            (
                "/api/login",
                json!({ "token": format!("tok-{role}"), "role": role, "user": { "id": 5, "name": name, "role": role } }),
            )
        };
        self.mount(
            Mock::given(method("POST"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_json(body)),
        );
    }

    pub fn mount_context(&self) {
        self.mount(
            Mock::given(method("GET"))
                .and(path("/api/academic-sessions/current"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "data": {
                        "academic_session": { "id": 7, "name": "2024/2025" },
                        "term": { "id": 1, "name": "first", "display_name": "First Term" }
                    }
                }))),
        );
    }
}

pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    /// Events read while waiting for something else.
    pub events: Vec<Value>,
}

impl Sidecar {
    pub fn spawn(api_base_url: &str) -> Self {
        let exe = env!("CARGO_BIN_EXE_schoold");
        let mut child = Command::new(exe)
            .args(["--api-base-url", api_base_url, "--debounce-ms", "0", "--http-timeout-secs", "5"])
            .env("SCHOOLD_LOG", "warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn schoold");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Sidecar {
            child,
            stdin,
            lines: rx,
            events: Vec::new(),
        }
    }

    pub fn send_raw(&mut self, line: &str) {
        writeln!(self.stdin, "{}", line).expect("write request");
        self.stdin.flush().expect("flush request");
    }

    fn next_value(&mut self, deadline: Instant) -> Value {
        let left = deadline.saturating_duration_since(Instant::now());
        let line = self.lines.recv_timeout(left).expect("sidecar output before timeout");
        serde_json::from_str(line.trim()).expect("parse sidecar line")
    }

    /// Next line that is not an event.
    pub fn next_response(&mut self) -> Value {
        let deadline = Instant::now() + READ_TIMEOUT;
        loop {
            let v = self.next_value(deadline);
            if v.get("event").is_some() {
                self.events.push(v);
                continue;
            }
            return v;
        }
    }

    pub fn request(&mut self, id: &str, method: &str, params: Value) -> Value {
        let payload = json!({ "id": id, "method": method, "params": params });
        self.send_raw(&payload.to_string());
        let v = self.next_response();
        assert_eq!(v.get("id").and_then(|v| v.as_str()), Some(id), "response id for {method}");
        v
    }

    pub fn request_ok(&mut self, id: &str, method: &str, params: Value) -> Value {
        let v = self.request(id, method, params);
        assert_eq!(v["ok"], true, "{method} failed: {v}");
        v["result"].clone()
    }

    /// Asserts the error code and returns the error object.
    pub fn request_err(&mut self, id: &str, method: &str, params: Value, code: &str) -> Value {
        let v = self.request(id, method, params);
        assert_eq!(v["ok"], false, "{method} unexpectedly succeeded: {v}");
        assert_eq!(v["error"]["code"], code, "{method}: {v}");
        v["error"].clone()
    }

    /// Waits for the next event with this name, consuming buffered ones first.
    pub fn wait_event(&mut self, name: &str) -> Value {
        if let Some(pos) = self.events.iter().position(|e| e["event"] == name) {
            return self.events.remove(pos)["result"].clone();
        }
        let deadline = Instant::now() + READ_TIMEOUT;
        loop {
            let v = self.next_value(deadline);
            if v["event"] == name {
                return v["result"].clone();
            }
            self.events.push(v);
        }
    }

    /// Messages of every `notify` event seen so far.
    pub fn notices(&self) -> Vec<String> {
        self.events
            .iter()
            .filter(|e| e["event"] == "notify")
            .filter_map(|e| e["result"]["message"].as_str().map(str::to_string))
            .collect()
    }

    /// Collects trailing events by issuing a cheap request.
    pub fn sync(&mut self) {
        let _ = self.request("sync", "health", json!({}));
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
