//! Authenticated request pipeline.
//!
//! Every call to the relay outside of login and renewal goes through
//! [`ApiClient::request`], which attaches the access token, records the
//! connection status and reacts to the relay's status codes.

use crate::auth::AuthSession;
use crate::config::ClientConfig;
use crate::models::Envelope;
use crate::session::{ConnectionStatus, Session};
use crate::store::{keys, StateStore};
use crate::{DomovikError, Result};
use rand::Rng;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Join the server base URL and an API path with exactly one slash.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// HTTP client for the relay API.
pub struct ApiClient {
    http: reqwest::Client,
    auth: Arc<AuthSession>,
    store: Arc<dyn StateStore>,
    backoff_min_ms: u64,
    backoff_max_ms: u64,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        auth: Arc<AuthSession>,
        store: Arc<dyn StateStore>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DomovikError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            auth,
            store,
            backoff_min_ms: config.renewal_backoff_min_ms,
            backoff_max_ms: config.renewal_backoff_max_ms.max(config.renewal_backoff_min_ms),
        })
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.auth
    }

    /// Issue one authenticated request.
    ///
    /// A 401 triggers one recovery (renewal, then re-login) and exactly one
    /// retry. Any other non-2xx status is mapped to an error after its side
    /// effects on the local state are persisted.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let mut retried = false;

        loop {
            let session = Session::load(self.store.as_ref())?;
            if !session.is_authorized() {
                return Err(DomovikError::NotAuthorized);
            }

            let url = endpoint(&session.server_url, path);
            debug!("{} {}", method, url);
            let mut req = self
                .http
                .request(method.clone(), &url)
                .header(AUTHORIZATION, &session.access_token);
            if let Some(body) = body.filter(|_| carries_body(&method)) {
                req = req.json(body);
            }

            let resp = match req.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("Request to {} failed: {}", url, e);
                    self.set_status(ConnectionStatus::NetworkError)?;
                    return Err(DomovikError::NetworkError);
                }
            };

            let status = resp.status();
            if status.is_success() {
                self.set_status(ConnectionStatus::Ok)?;
                return Ok(resp);
            }

            match status {
                StatusCode::UNAUTHORIZED if !retried => {
                    self.backoff().await;
                    self.auth.recover(&session.access_token).await?;
                    retried = true;
                }
                StatusCode::UNAUTHORIZED => {
                    self.auth.revoke()?;
                    return Err(DomovikError::BrowserUnauthorized);
                }
                StatusCode::PAYMENT_REQUIRED => {
                    self.set_status(ConnectionStatus::UnSubscribed)?;
                    return Err(DomovikError::NoSubscription);
                }
                StatusCode::GONE => {
                    self.auth.remote_unlink()?;
                    return Err(DomovikError::BrowserRemotelyUnlinked);
                }
                _ => {
                    error!("{} {} answered {}", method, path, status);
                    self.set_status(ConnectionStatus::ServerError)?;
                    return Err(DomovikError::ServerError);
                }
            }
        }
    }

    /// Request and decode the `data` member of the response envelope.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let resp = self.request(method, path, body.as_ref()).await?;
        let envelope: Envelope<T> = resp
            .json()
            .await
            .map_err(|e| DomovikError::InvalidResponse(format!("{}: {}", path, e)))?;
        Ok(envelope.data)
    }

    /// Request and discard the response body.
    pub async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<()> {
        self.request(method, path, body.as_ref()).await?;
        Ok(())
    }

    fn set_status(&self, status: ConnectionStatus) -> Result<()> {
        self.store.set(keys::CONNECTION_STATUS, json!(status))
    }

    async fn backoff(&self) {
        let ms = rand::thread_rng().gen_range(self.backoff_min_ms..=self.backoff_max_ms);
        debug!("Waiting {}ms before renewing the session", ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
