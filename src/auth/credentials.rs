//! Device credentials and secret handling.
//!
//! The password is held in a [`Secret`]: a zeroizing buffer that is
//! cleared when dropped, redacted in `Debug` output, and never
//! serialized. Nothing in this crate formats the secret into logs or
//! diagnostic messages.

use std::fmt;

use zeroize::{Zeroize, Zeroizing};

/// An opaque credential value, zeroized (memory cleared) on drop.
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Expose the secret for use in an authorization exchange.
    ///
    /// Callers must not persist or log the returned slice.
    pub fn reveal(&self) -> &str {
        &self.0
    }

    /// Explicitly wipe the secret ahead of drop.
    pub fn clear(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Everything needed to open a session to one device portal.
#[derive(Debug)]
pub struct Credentials {
    /// Device address: host or IP, optionally with a port (`10.0.0.5:11443`).
    pub address: String,
    pub username: String,
    secret: Secret,
}

impl Credentials {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<Secret>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Wipe the secret in place.
    pub fn clear_secret(&mut self) {
        self.secret.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_the_secret() {
        let creds = Credentials::new("10.0.0.5", "admin", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("Secret(****)"));
    }

    #[test]
    fn clear_wipes_the_secret() {
        let mut secret = Secret::new("hunter2");
        secret.clear();
        assert_eq!(secret.reveal(), "");
    }

    #[test]
    fn reveal_returns_the_original_value() {
        let secret = Secret::new("hunter2");
        assert_eq!(secret.reveal(), "hunter2");
    }
}
