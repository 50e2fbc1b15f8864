use super::error::ApiError;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use serde_json::Value;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    /// Multipart upload: one `file` part plus plain text fields.
    Upload {
        file_name: String,
        bytes: Vec<u8>,
        fields: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl ApiCall {
    fn new(method: Method, path: impl Into<String>) -> Self {
        ApiCall {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(Body::Json(body))
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).with_body(Body::Json(body))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn upload(
        path: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        fields: Vec<(String, String)>,
    ) -> Self {
        Self::new(Method::Post, path).with_body(Body::Upload {
            file_name: file_name.into(),
            bytes,
            fields,
        })
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }
}

/// Raw response body of a successful call.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Payload {
    pub fn json(&self) -> Result<Value, ApiError> {
        if self.bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Seam between the typed client and the wire. Tests substitute canned
/// implementations.
pub trait Transport: Send + Sync {
    fn send(&self, call: &ApiCall, token: Option<&str>) -> Result<Payload, ApiError>;
}

pub struct HttpTransport {
    base_url: String,
    timeout_secs: u64,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        Url::parse(base_url).map_err(|e| anyhow::anyhow!("invalid api base url {base_url}: {e}"))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(HttpTransport {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            client,
        })
    }

    fn url_for(&self, call: &ApiCall) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base_url, call.path.trim_start_matches('/'));
        let parsed = if call.query.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, &call.query)
        };
        parsed.map_err(|e| ApiError::Network(format!("bad url {raw}: {e}")))
    }
}

impl Transport for HttpTransport {
    fn send(&self, call: &ApiCall, token: Option<&str>) -> Result<Payload, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let url = self.url_for(call)?;
        let mut rb = match call.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        rb = rb
            .header(ACCEPT, "application/json")
            .header("X-Request-Id", &request_id);
        if let Some(token) = token {
            rb = rb.bearer_auth(token);
        }
        rb = match &call.body {
            Body::Empty => rb,
            Body::Json(v) => rb.json(v),
            Body::Upload {
                file_name,
                bytes,
                fields,
            } => {
                let mut form = Form::new().part("file", Part::bytes(bytes.clone()).file_name(file_name.clone()));
                for (k, v) in fields {
                    form = form.text(k.clone(), v.clone());
                }
                rb.multipart(form)
            }
        };

        let started = Instant::now();
        let resp = rb.send().map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout_secs)
            } else {
                ApiError::Network(e.to_string())
            }
        })?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .map_err(|e| ApiError::Network(e.to_string()))?
            .to_vec();
        tracing::debug!(
            request_id = %request_id,
            method = ?call.method,
            path = %call.path,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "api call"
        );

        if !(200..300).contains(&status) {
            let err = ApiError::from_status(status, &bytes);
            tracing::warn!(request_id = %request_id, path = %call.path, status, "api call failed: {err}");
            return Err(err);
        }
        Ok(Payload {
            content_type,
            bytes,
        })
    }
}
