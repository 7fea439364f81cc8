//! One logical session to one device portal.
//!
//! `PortalSession` drives the connection handshake through its phases,
//! keeps the device-identity snapshot, and notifies subscribers of
//! every phase transition. All operations take `&mut self`: one session
//! serializes its exchanges by construction, and a concurrent
//! `connect()` on the same session is a compile error rather than a
//! runtime hazard. Independent sessions to different devices are fully
//! independent.
//!
//! `connect()` never returns an error. Transport failures, rejected
//! credentials, and unparseable responses all resolve to a `Failed`
//! status, a terminal failure phase, and one diagnostic message; the
//! caller reads the status/phase pair and the diagnostic stream instead
//! of inspecting transport-level error types.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::error::is_auth_status;
use crate::api::{PortalClient, PortalError};
use crate::auth::Credentials;
use crate::config::PortalConfig;
use crate::diag::{DiagnosticSink, NullDiagnostics};
use crate::models::{DeviceFamilyResponse, DeviceNameResponse, OperatingSystemInfo};
use crate::retry::{self, ConfirmError, ConfirmProbe, ProbeOutcome, RetryPolicy};

/// Handshake target; also answers the device name. A cheap GET that
/// exercises authentication and lets the portal issue a token cookie.
const ENDPOINT_DEVICE_NAME: &str = "api/os/machinename";

/// Operating-system snapshot.
const ENDPOINT_OS_INFO: &str = "api/os/info";

/// Device family string (desktop, Xbox, IoT, ...).
const ENDPOINT_DEVICE_FAMILY: &str = "api/os/devicefamily";

/// Fine-grained sub-state of a single connection attempt.
///
/// Within one attempt a subscriber never sees the phase move backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Idle,
    SendingRequest,
    ReceivingResponse,
    AuthenticationInProgress,
    AuthenticationFailed,
    Completed,
    /// The attempt ended in a state this client could not classify.
    Unknown,
}

/// Coarse outcome of a connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Failed,
}

/// Notification delivered to subscribers on every phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub status: ConnectionStatus,
    pub phase: ConnectionPhase,
}

/// An authenticated session to one device portal.
///
/// `Connected` and `Failed` are terminal for an attempt; a later
/// `connect()` starts a fresh attempt. Dropping the session tears
/// everything down; no token or snapshot survives into a new instance.
pub struct PortalSession {
    client: PortalClient,
    os_info: Option<OperatingSystemInfo>,
    device_name: Option<String>,
    device_family: Option<String>,
    last_http_status: Option<StatusCode>,
    phase: ConnectionPhase,
    status: Option<ConnectionStatus>,
    subscribers: Vec<UnboundedSender<ConnectionEvent>>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl PortalSession {
    /// Create a session with diagnostics discarded.
    pub fn new(credentials: Credentials, config: &PortalConfig) -> Result<Self, PortalError> {
        Self::with_diagnostics(credentials, config, Arc::new(NullDiagnostics))
    }

    /// Create a session that reports progress and errors to `diagnostics`.
    pub fn with_diagnostics(
        credentials: Credentials,
        config: &PortalConfig,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, PortalError> {
        Ok(Self {
            client: PortalClient::new(credentials, config)?,
            os_info: None,
            device_name: None,
            device_family: None,
            last_http_status: None,
            phase: ConnectionPhase::Idle,
            status: None,
            subscribers: Vec::new(),
            diagnostics,
        })
    }

    /// Register an observer for phase transitions.
    ///
    /// Every transition is delivered exactly once, in order. Dropping
    /// the receiver unsubscribes.
    pub fn subscribe(&mut self) -> UnboundedReceiver<ConnectionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// OS snapshot from the last successful full handshake, if any.
    pub fn os_info(&self) -> Option<&OperatingSystemInfo> {
        self.os_info.as_ref()
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    pub fn device_family(&self) -> Option<&str> {
        self.device_family.as_deref()
    }

    /// HTTP status of the most recent exchange. `None` when the last
    /// failure happened below HTTP (timeout, DNS, refused connection).
    pub fn last_http_status(&self) -> Option<StatusCode> {
        self.last_http_status
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Coarse status of the last attempt; `None` before any attempt.
    pub fn status(&self) -> Option<ConnectionStatus> {
        self.status
    }

    /// Anti-forgery token currently held for this session.
    pub fn csrf_token(&self) -> Option<&str> {
        self.client.csrf_token()
    }

    /// Run the connection handshake.
    ///
    /// With `update_only == false` the session re-fetches the full
    /// device identity (name, OS snapshot, family) after a successful
    /// handshake. With `update_only == true` only liveness and the
    /// token are refreshed and the existing snapshot is left untouched.
    ///
    /// Resolves to the final [`ConnectionStatus`]; failures never
    /// surface as panics or errors from this method.
    pub async fn connect(&mut self, update_only: bool) -> ConnectionStatus {
        self.last_http_status = None;
        if !update_only {
            self.os_info = None;
            self.device_name = None;
            self.device_family = None;
        }

        self.transition(ConnectionStatus::Connecting, ConnectionPhase::SendingRequest);

        let response = match self.client.signed_get(ENDPOINT_DEVICE_NAME).await {
            Ok(response) => response,
            Err(err) => return self.fail_transport(&err),
        };

        self.transition(ConnectionStatus::Connecting, ConnectionPhase::ReceivingResponse);
        let status = response.status();
        self.last_http_status = Some(status);

        if !status.is_success() {
            return self.fail_http(status);
        }

        if !update_only {
            let name: DeviceNameResponse = match response.json().await {
                Ok(parsed) => parsed,
                Err(err) => return self.fail_parse(ENDPOINT_DEVICE_NAME, &err),
            };
            let info = match self.fetch_json::<OperatingSystemInfo>(ENDPOINT_OS_INFO).await {
                Ok(info) => info,
                Err(status) => return status,
            };
            let family = match self.fetch_json::<DeviceFamilyResponse>(ENDPOINT_DEVICE_FAMILY).await
            {
                Ok(family) => family,
                Err(status) => return status,
            };

            // Populate the whole snapshot before observers hear
            // Connected; no field is visible mid-transition.
            self.device_name = Some(name.name);
            self.os_info = Some(info);
            self.device_family = Some(family.family);
        }

        debug!(address = self.client.address(), update_only, "portal handshake complete");
        self.transition(ConnectionStatus::Connected, ConnectionPhase::Completed);
        ConnectionStatus::Connected
    }

    /// Ask the device to take a new name.
    ///
    /// The portal applies the rename asynchronously: a success here
    /// only means the request was accepted. Follow with
    /// [`confirm_connected`](Self::confirm_connected) (or use
    /// [`rename_device`](Self::rename_device)) to verify the device
    /// came back.
    pub async fn set_device_name(&mut self, name: &str) -> Result<(), PortalError> {
        let encoded = URL_SAFE.encode(name);
        let response = self
            .client
            .signed_post(ENDPOINT_DEVICE_NAME, &[("name", encoded.as_str())])
            .await?;

        let status = response.status();
        self.last_http_status = Some(status);
        if !status.is_success() {
            warn!(address = self.client.address(), %status, "device name write rejected");
            return Err(PortalError::from_write_status(status));
        }

        debug!(address = self.client.address(), "device name write accepted");
        Ok(())
    }

    /// Re-poll the handshake until the device answers with success.
    ///
    /// Each probe is a `connect(update_only = true)`; the snapshot is
    /// not re-fetched. Bounded by the policy's attempt budget and
    /// interruptible through `cancel`. Returns the attempt that
    /// confirmed.
    pub async fn confirm_connected(
        &mut self,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<u32, ConfirmError> {
        struct LivenessProbe<'a> {
            session: &'a mut PortalSession,
        }

        impl ConfirmProbe for LivenessProbe<'_> {
            async fn probe(&mut self, _attempt: u32) -> ProbeOutcome {
                match self.session.connect(true).await {
                    ConnectionStatus::Connected => ProbeOutcome::Confirmed,
                    _ => ProbeOutcome::Pending,
                }
            }
        }

        retry::confirm(policy, cancel, &mut LivenessProbe { session: self }).await
    }

    /// Rename the device and verify it applied: write, then confirm by
    /// bounded re-polling.
    ///
    /// The three failure modes stay distinguishable:
    /// [`PortalError::WriteRejected`] / [`PortalError::Authentication`]
    /// when the write itself is refused, and
    /// [`PortalError::Confirmation`] when the write was accepted but
    /// could not be verified in time.
    pub async fn rename_device(
        &mut self,
        name: &str,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<(), PortalError> {
        self.set_device_name(name).await?;
        self.confirm_connected(policy, cancel).await?;
        Ok(())
    }

    /// Signed GET plus status check plus JSON parse, funnelling every
    /// failure through the usual Failed handling.
    async fn fetch_json<T: DeserializeOwned>(
        &mut self,
        path: &'static str,
    ) -> Result<T, ConnectionStatus> {
        let response = match self.client.signed_get(path).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail_transport(&err)),
        };

        let status = response.status();
        self.last_http_status = Some(status);
        if !status.is_success() {
            return Err(self.fail_http(status));
        }

        response.json().await.map_err(|err| self.fail_parse(path, &err))
    }

    fn transition(&mut self, status: ConnectionStatus, phase: ConnectionPhase) {
        self.status = Some(status);
        self.phase = phase;
        let event = ConnectionEvent { status, phase };
        // Prune subscribers whose receiver is gone.
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    fn fail_transport(&mut self, err: &PortalError) -> ConnectionStatus {
        warn!(address = self.client.address(), error = %err, "portal connection failed");
        self.transition(ConnectionStatus::Failed, ConnectionPhase::AuthenticationFailed);
        self.diagnostics
            .emit(&format!("Connection to {} failed: {}", self.client.address(), err));
        ConnectionStatus::Failed
    }

    fn fail_http(&mut self, status: StatusCode) -> ConnectionStatus {
        if is_auth_status(status) {
            self.transition(
                ConnectionStatus::Connecting,
                ConnectionPhase::AuthenticationInProgress,
            );
        }
        warn!(address = self.client.address(), %status, "portal rejected the handshake");
        self.transition(ConnectionStatus::Failed, ConnectionPhase::AuthenticationFailed);
        self.diagnostics.emit(&format!(
            "Connection to {} failed with HTTP status {}",
            self.client.address(),
            status
        ));
        ConnectionStatus::Failed
    }

    fn fail_parse(&mut self, path: &str, err: &reqwest::Error) -> ConnectionStatus {
        warn!(address = self.client.address(), path, error = %err, "unparseable portal response");
        self.transition(ConnectionStatus::Failed, ConnectionPhase::AuthenticationFailed);
        self.diagnostics.emit(&format!(
            "Device {} answered {} with an unparseable response: {}",
            self.client.address(),
            path,
            err
        ));
        ConnectionStatus::Failed
    }
}
