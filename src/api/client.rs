//! HTTP plumbing for one portal session.
//!
//! `PortalClient` owns the reqwest client, the credentials, and the
//! anti-forgery token store, and signs every outgoing request: HTTP
//! basic auth plus the CSRF header appropriate for the method. Response
//! cookies are absorbed into the token store before the response is
//! handed back, so a later request always signs with the freshest
//! token.

use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::{Credentials, CsrfTokenStore};
use crate::config::PortalConfig;

use super::PortalError;

/// Signs and executes requests against a single device portal.
///
/// One client per session; exchanges are sequenced by the exclusive
/// receivers on the methods below, which keeps the token store's
/// absorb-then-sign ordering trivially correct.
#[derive(Debug)]
pub struct PortalClient {
    http: Client,
    base: Url,
    credentials: Credentials,
    tokens: CsrfTokenStore,
}

impl PortalClient {
    pub fn new(credentials: Credentials, config: &PortalConfig) -> Result<Self, PortalError> {
        let scheme = if config.use_tls { "https" } else { "http" };
        let base = Url::parse(&format!("{}://{}/", scheme, credentials.address))
            .map_err(|e| PortalError::Address(format!("{}: {}", credentials.address, e)))?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.danger_accept_invalid_certs)
            .build()?;

        Ok(Self {
            http,
            base,
            credentials,
            tokens: CsrfTokenStore::new(),
        })
    }

    /// Device address this client talks to.
    pub fn address(&self) -> &str {
        &self.credentials.address
    }

    /// The current anti-forgery token, if one has been issued.
    pub fn csrf_token(&self) -> Option<&str> {
        self.tokens.token()
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, PortalError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| PortalError::Address(format!("{}: {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Issue a signed GET against a portal path.
    pub async fn signed_get(&mut self, path: &str) -> Result<Response, PortalError> {
        self.execute(Method::GET, path, &[]).await
    }

    /// Issue a signed GET and parse the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&mut self, path: &str) -> Result<T, PortalError> {
        let response = self.signed_get(path).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::InvalidResponse(format!(
                "GET {} answered {}",
                path, status
            )));
        }
        response
            .json()
            .await
            .map_err(|e| PortalError::InvalidResponse(format!("GET {}: {}", path, e)))
    }

    /// Issue a signed POST with query parameters and no body.
    pub async fn signed_post(
        &mut self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, PortalError> {
        self.execute(Method::POST, path, query).await
    }

    /// Sign, send, and absorb. Transport failures surface as
    /// `PortalError::Transport`; the HTTP status is left for the
    /// caller to judge.
    async fn execute(
        &mut self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, PortalError> {
        let url = self.endpoint(path, query)?;
        let (header_name, header_value) = self.tokens.header_for(&method);

        debug!(%method, %url, csrf_header = header_name, "portal request");

        let response = self
            .http
            .request(method, url)
            .basic_auth(&self.credentials.username, Some(self.credentials.secret().reveal()))
            .header(header_name, header_value)
            .send()
            .await?;

        // Harvest a fresh token before anything else can sign with a
        // stale one.
        self.tokens.absorb(response.headers());

        debug!(status = %response.status(), "portal response");
        Ok(response)
    }
}
