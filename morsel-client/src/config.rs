//! Tracker configuration

use std::time::Duration;

/// Default API origin for local development
const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Environment variable overriding the API origin
const API_URL_ENV: &str = "MORSEL_API_URL";

/// Poll cadence when the live channel is unavailable
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Initial delay before re-attempting a failed push connection
const INITIAL_RECONNECT_DELAY_SECS: u64 = 5;

/// Max reconnect delay
const MAX_RECONNECT_DELAY_SECS: u64 = 120;

/// Transport strategy for the live update channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// WebSocket push, degrading to polling whenever push is down
    #[default]
    Auto,
    /// WebSocket push only, reconnecting forever
    Push,
    /// Interval polling only
    Poll,
}

/// Configuration for connecting to the ordering backend
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// API origin (e.g., "http://localhost:8080")
    pub base_url: String,

    /// Transport strategy for status updates
    pub transport: TransportMode,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Poll cadence
    pub poll_interval: Duration,

    /// First reconnect delay after a push failure
    pub reconnect_initial: Duration,

    /// Reconnect delay ceiling
    pub reconnect_max: Duration,
}

impl TrackerConfig {
    /// Create a configuration pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport: TransportMode::default(),
            timeout: 30,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            reconnect_initial: Duration::from_secs(INITIAL_RECONNECT_DELAY_SECS),
            reconnect_max: Duration::from_secs(MAX_RECONNECT_DELAY_SECS),
        }
    }

    /// Resolve the API origin from the environment, falling back to the
    /// local-dev default.
    pub fn from_env() -> Self {
        let base_url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Set the transport strategy
    pub fn with_transport(mut self, transport: TransportMode) -> Self {
        self.transport = transport;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the poll cadence
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the push reconnect backoff window
    pub fn with_reconnect(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_initial = initial;
        self.reconnect_max = max;
        self
    }

    /// WebSocket endpoint for one order's status stream.
    ///
    /// Derived from the HTTP origin by scheme rewrite, the same way the
    /// backend expects it: `ws(s)://{origin}/ws/order-status?orderId={id}`.
    pub fn ws_url(&self, order_id: &str) -> String {
        let ws_base = self
            .base_url
            .replace("https://", "wss://")
            .replace("http://", "ws://");
        format!("{ws_base}/ws/order-status?orderId={order_id}")
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
