//! Authentication state for a portal session.
//!
//! This module provides:
//! - `Credentials` / `Secret`: device address, username, and a
//!   zeroizing password holder
//! - `CsrfTokenStore`: the anti-forgery token issued by the portal and
//!   echoed on every subsequent request

pub mod credentials;
pub mod token;

pub use credentials::{Credentials, Secret};
pub use token::{CsrfTokenStore, CSRF_TOKEN_NAME, CSRF_TOKEN_WRITE_HEADER};
