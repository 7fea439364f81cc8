//! Session configuration.
//!
//! Knobs for the HTTP exchanges a session performs. Everything is
//! per-session; there is no process-wide state.

use std::time::Duration;

/// HTTP request timeout in seconds.
/// Device portals answer quickly on a LAN; 30s covers slow first-boot
/// responses while still failing fast on unreachable devices.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Timeout applied to every network call. A timeout surfaces as a
    /// transport failure with no HTTP status.
    pub request_timeout: Duration,

    /// Use `https` for the portal URL. Disable only for portals that
    /// expose plain HTTP (or for tests against a local mock).
    pub use_tls: bool,

    /// Skip TLS certificate validation. Device portals routinely
    /// present self-signed certificates; whether to trust one is the
    /// caller's decision, which is why this is an explicit opt-in.
    pub danger_accept_invalid_certs: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            use_tls: true,
            danger_accept_invalid_certs: false,
        }
    }
}

impl PortalConfig {
    /// Configuration for portals reachable over plain HTTP.
    pub fn insecure_http() -> Self {
        Self {
            use_tls: false,
            ..Self::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn accept_invalid_certs(mut self) -> Self {
        self.danger_accept_invalid_certs = true;
        self
    }
}
