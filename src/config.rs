use clap::Parser;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000/api";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "helix",
    version,
    about = "Desktop client for the Helix outreach-sequence assistant"
)]
pub struct Config {
    /// Base URL of the Helix REST API.
    #[arg(long, env = "HELIX_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: Url,

    /// Per-request timeout. Unset means the HTTP client default.
    #[arg(long, env = "HELIX_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Log filter directive, e.g. `info` or `helix=debug`.
    #[arg(long, env = "HELIX_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Config {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
