use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://localhost:7278/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Service root; resource paths such as `/point` are appended to it.
    pub base_url: String,
    pub timeout: Duration,
    /// Accept self-signed certificates (local development service).
    pub accept_invalid_certs: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            accept_invalid_certs: false,
        }
    }
}

impl GatewayConfig {
    /// Reads `ATLAS_API_URL`, `ATLAS_TIMEOUT_MS` and `ATLAS_ACCEPT_INVALID_CERTS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let base_url = lookup("ATLAS_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.base_url);
        let timeout_ms = lookup("ATLAS_TIMEOUT_MS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let accept_invalid_certs = lookup("ATLAS_ACCEPT_INVALID_CERTS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.accept_invalid_certs);

        Self {
            base_url,
            timeout: Duration::from_millis(timeout_ms),
            accept_invalid_certs,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `base_url` joined with `path`, without doubling the separator.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
