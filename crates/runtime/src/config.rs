use std::time::Duration;

use foundation::math::WebMercator;
use remote::GatewayConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Deadline applied around every gateway call.
    pub call_timeout: Duration,
    pub projection: WebMercator,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_millis(remote::DEFAULT_TIMEOUT_MS),
            projection: WebMercator::default(),
        }
    }
}

impl SessionConfig {
    /// Uses the transport timeout as the call deadline.
    pub fn from_gateway(config: &GatewayConfig) -> Self {
        Self {
            call_timeout: config.timeout,
            ..Self::default()
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_projection(mut self, projection: WebMercator) -> Self {
        self.projection = projection;
        self
    }
}
