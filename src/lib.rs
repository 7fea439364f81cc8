//! Client library for a remote device's HTTP management portal.
//!
//! The portal protects state-changing requests with an anti-forgery
//! (CSRF) token issued via cookie on GET requests and echoed back via a
//! custom header on writes. This crate provides the substrate every
//! portal operation depends on:
//!
//! - [`PortalSession`]: one logical session per device; drives the
//!   multi-phase connection handshake and notifies subscribers of every
//!   phase transition
//! - [`CsrfTokenStore`]: the token lifecycle threaded through every
//!   request
//! - [`retry`]: a bounded, cancellable "re-check until confirmed" helper
//!   used to verify that a write was applied by the device
//!
//! A minimal round trip:
//!
//! ```no_run
//! use device_portal::{Credentials, PortalConfig, PortalSession, ConnectionStatus};
//!
//! # async fn demo() -> Result<(), device_portal::PortalError> {
//! let creds = Credentials::new("10.0.0.5", "admin", "hunter2");
//! let mut session = PortalSession::new(creds, &PortalConfig::default())?;
//!
//! if session.connect(false).await == ConnectionStatus::Connected {
//!     if let Some(info) = session.os_info() {
//!         println!("connected to {} ({})", info.name, info.platform);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod diag;
pub mod models;
pub mod retry;
pub mod session;

pub use api::{PortalClient, PortalError};
pub use auth::{Credentials, CsrfTokenStore, Secret};
pub use config::PortalConfig;
pub use diag::{DiagnosticSink, FnDiagnostics, NullDiagnostics};
pub use models::OperatingSystemInfo;
pub use retry::{ConfirmError, ConfirmProbe, ProbeOutcome, RetryPolicy};
pub use session::{ConnectionEvent, ConnectionPhase, ConnectionStatus, PortalSession};
