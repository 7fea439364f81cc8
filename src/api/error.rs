use reqwest::StatusCode;
use thiserror::Error;

use crate::retry::ConfirmError;

#[derive(Error, Debug)]
pub enum PortalError {
    /// Timeout, DNS failure, refused connection, or TLS failure.
    /// No HTTP status is available for these.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The portal rejected the token or credentials.
    #[error("authentication rejected with HTTP status {status}")]
    Authentication { status: StatusCode },

    /// A mutating request was refused by the portal.
    #[error("device rejected the write with HTTP status {status}")]
    WriteRejected { status: StatusCode },

    /// The device address could not be turned into a portal URL.
    #[error("invalid device address: {0}")]
    Address(String),

    /// The portal answered with a body this client could not parse.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A write could not be verified within bounded attempts, or the
    /// verification was cancelled.
    #[error(transparent)]
    Confirmation(#[from] ConfirmError),
}

impl PortalError {
    /// Classify a non-success HTTP status on a mutating request.
    pub(crate) fn from_write_status(status: StatusCode) -> Self {
        if is_auth_status(status) {
            PortalError::Authentication { status }
        } else {
            PortalError::WriteRejected { status }
        }
    }
}

/// True for statuses that indicate a rejected token or rejected
/// credentials rather than a generic failure.
pub(crate) fn is_auth_status(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}
