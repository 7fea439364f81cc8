//! HTTP layer for the device portal.
//!
//! `PortalClient` signs every request with basic auth and the
//! anti-forgery header, and harvests tokens from response cookies.
//! `PortalError` is the error taxonomy shared across the crate.

pub mod client;
pub mod error;

pub use client::PortalClient;
pub use error::PortalError;
