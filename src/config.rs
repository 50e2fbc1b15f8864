use clap::Parser;
use std::time::Duration;

/// Sidecar settings. Every flag can also come from the environment so a
/// shell can configure the process without touching its argv.
#[derive(Debug, Clone, Parser)]
#[command(name = "schoold", version, about = "School portal sidecar")]
pub struct Config {
    /// Base URL of the portal REST API.
    #[arg(long, env = "SCHOOLD_API_BASE_URL", default_value = "http://127.0.0.1:8000/api")]
    pub api_base_url: String,

    #[arg(long, env = "SCHOOLD_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Delay before a filter-triggered load is fetched.
    #[arg(long, env = "SCHOOLD_DEBOUNCE_MS", default_value_t = 150)]
    pub debounce_ms: u64,

    /// Tracing filter directive, e.g. `schoold=debug`.
    #[arg(long, env = "SCHOOLD_LOG", default_value = "info")]
    pub log: String,
}

impl Config {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
