//! Credential lifecycle: login, token renewal, re-login, node registration
//! and unlinking.
//!
//! States: `Unlinked -> Linked(Unauthorized) -> Linked(Authorized)`. A failed
//! recovery drops back to unauthorized; an explicit unlink or a remote unlink
//! returns to the unlinked baseline from anywhere.

use crate::api::{endpoint, ApiClient};
use crate::config::ClientConfig;
use crate::crypto::derive_api_password;
use crate::host::{BrowserHost, Notice, Notifier};
use crate::models::{Browser, Envelope, RegisterBrowser, RenameBrowser, TokenPair};
use crate::session::{ConnectionStatus, Session};
use crate::store::{keys, StateStore};
use crate::{DomovikError, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Owns the session credentials of this node.
pub struct AuthSession {
    http: reqwest::Client,
    store: Arc<dyn StateStore>,
    host: Arc<dyn BrowserHost>,
    notifier: Arc<dyn Notifier>,
    default_browser_name: String,
    /// Held for the whole of a renewal so concurrent 401s share one attempt.
    renewal: Mutex<()>,
}

impl AuthSession {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn StateStore>,
        host: Arc<dyn BrowserHost>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DomovikError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            store,
            host,
            notifier,
            default_browser_name: config.default_browser_name.clone(),
            renewal: Mutex::new(()),
        })
    }

    pub fn session(&self) -> Result<Session> {
        Session::load(self.store.as_ref())
    }

    pub fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    /// Authenticate against `server_url` with the user's password.
    ///
    /// Only the derived API password is sent and kept.
    pub async fn login(&self, server_url: &str, email: &str, password: &str) -> Result<()> {
        let api_password = derive_api_password(password)?;
        self.perform_login(server_url, email, &api_password).await?;
        info!("Logged in to {} as {}", server_url, email);
        Ok(())
    }

    /// Log in again with a freshly entered password, reusing the stored
    /// email and server.
    pub async fn relogin(&self, password: &str) -> Result<()> {
        let session = self.session()?;
        if session.server_url.is_empty() || session.email.is_empty() {
            return Err(DomovikError::NotLinked);
        }
        let api_password = derive_api_password(password)?;
        self.perform_login(&session.server_url, &session.email, &api_password)
            .await?;
        info!("Re-authorized {} on {}", session.email, session.server_url);
        Ok(())
    }

    async fn perform_login(&self, server_url: &str, email: &str, api_password: &str) -> Result<()> {
        let resp = self
            .http
            .post(endpoint(server_url, "/session"))
            .form(&[("user[email]", email), ("user[password]", api_password)])
            .send()
            .await
            .map_err(|e| {
                warn!("Login request failed: {}", e);
                DomovikError::NetworkError
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED => DomovikError::CheckCredentials,
                StatusCode::NOT_FOUND => DomovikError::ServerNotFound(server_url.to_string()),
                StatusCode::INTERNAL_SERVER_ERROR => DomovikError::ServerError,
                _ => DomovikError::NetworkError,
            });
        }

        let tokens = decode_tokens(resp).await?;
        self.store.set_many(&[
            (keys::API_PASSWORD, json!(api_password)),
            (keys::LINKED, json!(false)),
            (keys::AUTHORIZED, json!(true)),
            (keys::CONNECTED, json!(true)),
            (keys::ACCESS_TOKEN, json!(tokens.access_token)),
            (keys::RENEWAL_TOKEN, json!(tokens.renewal_token)),
            (keys::SERVER_URL, json!(server_url)),
            (keys::EMAIL, json!(email)),
        ])
    }

    /// Exchange the renewal token for a fresh token pair.
    pub async fn renew_token(&self) -> Result<()> {
        let session = self.session()?;
        let resp = self
            .http
            .post(endpoint(&session.server_url, "/session/renew"))
            .header(AUTHORIZATION, &session.renewal_token)
            .send()
            .await
            .map_err(|e| {
                warn!("Renewal request failed: {}", e);
                DomovikError::NetworkError
            })?;

        if resp.status() != StatusCode::OK {
            return Err(DomovikError::RenewalFailed);
        }

        let tokens = decode_tokens(resp).await?;
        self.store.set_many(&[
            (keys::AUTHORIZED, json!(true)),
            (keys::ACCESS_TOKEN, json!(tokens.access_token)),
            (keys::RENEWAL_TOKEN, json!(tokens.renewal_token)),
        ])?;
        info!("Access token renewed");
        Ok(())
    }

    /// Log in again with the stored API password.
    pub async fn relogin_stored(&self) -> Result<()> {
        let session = self.session()?;
        let resp = self
            .http
            .post(endpoint(&session.server_url, "/session"))
            .form(&[
                ("user[email]", session.email.as_str()),
                ("user[password]", session.api_password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!("Re-login request failed: {}", e);
                DomovikError::ReloginFailed
            })?;

        if resp.status() != StatusCode::OK {
            return Err(DomovikError::ReloginFailed);
        }

        let tokens = decode_tokens(resp).await?;
        self.store.set_many(&[
            (keys::AUTHORIZED, json!(true)),
            (keys::ACCESS_TOKEN, json!(tokens.access_token)),
            (keys::RENEWAL_TOKEN, json!(tokens.renewal_token)),
        ])?;
        info!("Re-logged in with stored credentials");
        Ok(())
    }

    /// Recover from a 401 received while using `failed_token`.
    ///
    /// Renewal first, full re-login second. Callers queue on one lock and the
    /// outcome is written before it is released: whoever finds the token
    /// already replaced retries, whoever finds the session already revoked
    /// fails without touching the network.
    pub async fn recover(&self, failed_token: &str) -> Result<()> {
        let _guard = self.renewal.lock().await;

        let session = self.session()?;
        if !session.is_authorized() {
            debug!("Session was revoked by a concurrent request");
            return Err(DomovikError::BrowserUnauthorized);
        }
        if session.access_token != failed_token {
            debug!("Token already renewed by a concurrent request");
            return Ok(());
        }

        if let Err(e) = self.renew_token().await {
            warn!("Token renewal failed: {}; trying a full re-login", e);
            if let Err(e) = self.relogin_stored().await {
                warn!("Could not recover the session: {}", e);
                self.revoke()?;
                return Err(DomovikError::BrowserUnauthorized);
            }
        }
        Ok(())
    }

    /// Register this node and remember its uuid.
    pub async fn register_browser(&self, api: &ApiClient, name: Option<&str>) -> Result<Browser> {
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(self.default_browser_name.as_str())
            .to_string();
        self.store.set(keys::BROWSER_NAME, json!(name))?;

        let body = serde_json::to_value(RegisterBrowser { name })?;
        let browser: Browser = api.call(Method::POST, "/browsers", Some(body)).await?;
        if browser.uuid.is_empty() {
            return Err(DomovikError::InvalidResponse(
                "Registration returned no uuid".to_string(),
            ));
        }
        self.store.set(keys::UUID, json!(browser.uuid))?;
        info!("Registered browser {} as {}", browser.name, browser.uuid);
        Ok(browser)
    }

    /// Confirm the relay knows this node, and mark it linked.
    pub async fn check_browser(&self, api: &ApiClient) -> Result<Browser> {
        let session = self.session()?;
        let uuid = session.node_uuid().ok_or(DomovikError::NotLinked)?;

        let found: Option<Browser> = api
            .call(Method::GET, &format!("/browsers/{}", uuid), None)
            .await?;
        match found {
            Some(browser) => {
                self.store.set(keys::LINKED, json!(true))?;
                self.notify(Notice::BrowserLinked(browser.name.clone()));
                Ok(browser)
            }
            None => {
                self.store.set(keys::LINKED, json!(false))?;
                Err(DomovikError::NotLinked)
            }
        }
    }

    pub async fn rename_browser(&self, api: &ApiClient, name: &str) -> Result<Browser> {
        let session = self.session()?;
        let uuid = session.node_uuid().ok_or(DomovikError::MissingUuid)?;
        let name = if name.trim().is_empty() {
            self.default_browser_name.clone()
        } else {
            name.to_string()
        };

        let body = serde_json::to_value(RenameBrowser {
            uuid: uuid.to_string(),
            name,
        })?;
        let browser: Browser = api
            .call(Method::PATCH, &format!("/browsers/{}", uuid), Some(body))
            .await?;
        self.store.set(keys::BROWSER_NAME, json!(browser.name))?;
        Ok(browser)
    }

    /// Delete this node on the relay, then clear local state whatever the
    /// outcome of the delete.
    pub async fn unlink(&self, api: &ApiClient) -> Result<()> {
        let session = self.session()?;
        if let Some(uuid) = session.node_uuid() {
            if let Err(e) = api.execute(Method::DELETE, &format!("/browsers/{}", uuid), None).await {
                warn!("Server-side unlink failed, clearing locally anyway: {}", e);
            }
        }
        self.clear()?;
        info!("Browser unlinked");
        Ok(())
    }

    /// Wipe credentials, key material and caches in one write.
    pub fn clear(&self) -> Result<()> {
        self.unauthorized_hook();
        self.store.set_many(&Session::cleared_entries())
    }

    /// Exhausted recovery: stay linked but stop issuing requests.
    pub fn revoke(&self) -> Result<()> {
        warn!("Browser is no longer authorized");
        self.notify(Notice::BrowserUnauthorized);
        self.unauthorized_hook();
        self.store.set_many(&[
            (keys::AUTHORIZED, json!(false)),
            (keys::CONNECTION_STATUS, json!(ConnectionStatus::UnAuthorized)),
        ])
    }

    /// The relay says this node no longer exists.
    pub fn remote_unlink(&self) -> Result<()> {
        warn!("Browser was unlinked remotely; clearing local state");
        self.notify(Notice::BrowserRemotelyUnlinked);
        self.clear()
    }

    /// Reset the link flags after a failed link attempt.
    pub fn reset_link_flags(&self) -> Result<()> {
        self.store.set_many(&[
            (keys::AUTHORIZED, json!(false)),
            (keys::CONNECTED, json!(false)),
            (keys::LINKED, json!(false)),
        ])
    }

    pub fn authorized_hook(&self) {
        self.host.set_action_enabled(true);
    }

    pub fn unauthorized_hook(&self) {
        self.host.set_action_enabled(false);
        self.host.remove_all_menus();
    }
}

async fn decode_tokens(resp: reqwest::Response) -> Result<TokenPair> {
    let envelope: Envelope<TokenPair> = resp
        .json()
        .await
        .map_err(|e| DomovikError::InvalidResponse(format!("Token response: {}", e)))?;
    let tokens = envelope.data;
    if tokens.access_token.is_empty() || tokens.renewal_token.is_empty() {
        return Err(DomovikError::InvalidResponse(
            "Token response without tokens".to_string(),
        ));
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testkit::{RecordingHost, RecordingNotifier};
    use httpmock::Method::POST;
    use httpmock::MockServer;

    struct Fixture {
        store: Arc<dyn StateStore>,
        host: Arc<RecordingHost>,
        notifier: Arc<RecordingNotifier>,
        auth: AuthSession,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let host = Arc::new(RecordingHost::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let auth = AuthSession::new(
            &ClientConfig::default(),
            store.clone(),
            host.clone(),
            notifier.clone(),
        )
        .unwrap();
        Fixture {
            store,
            host,
            notifier,
            auth,
        }
    }

    fn token_body(access: &str, renewal: &str) -> serde_json::Value {
        json!({"data": {"access_token": access, "renewal_token": renewal}})
    }

    #[tokio::test]
    async fn login_stores_tokens_and_api_password() {
        let server = MockServer::start_async().await;
        let api_password = derive_api_password("s3cret").unwrap();
        let login = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/session")
                    .x_www_form_urlencoded_tuple("user[email]", "me@example.org")
                    .x_www_form_urlencoded_tuple("user[password]", api_password.as_str());
                then.status(200).json_body(token_body("a1", "r1"));
            })
            .await;

        let fx = fixture();
        let base = server.url("/api/v1/");
        fx.auth.login(&base, "me@example.org", "s3cret").await.unwrap();

        login.assert_async().await;
        let session = fx.auth.session().unwrap();
        assert!(session.authorized);
        assert!(session.connected);
        assert!(!session.linked);
        assert_eq!(session.access_token, "a1");
        assert_eq!(session.renewal_token, "r1");
        assert_eq!(session.server_url, base);
        assert_eq!(session.email, "me@example.org");
        assert_eq!(session.api_password, api_password);
        assert_ne!(session.api_password, "s3cret");
    }

    async fn login_error(status: u16) -> DomovikError {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/session");
                then.status(status);
            })
            .await;

        let fx = fixture();
        let err = fx
            .auth
            .login(&server.base_url(), "me@example.org", "pw")
            .await
            .unwrap_err();
        assert!(!fx.auth.session().unwrap().authorized);
        err
    }

    #[tokio::test]
    async fn login_failures_are_classified() {
        assert!(matches!(login_error(401).await, DomovikError::CheckCredentials));
        assert!(matches!(login_error(404).await, DomovikError::ServerNotFound(_)));
        assert!(matches!(login_error(500).await, DomovikError::ServerError));
        assert!(matches!(login_error(418).await, DomovikError::NetworkError));
    }

    #[tokio::test]
    async fn login_unreachable_server_is_network_error() {
        let fx = fixture();
        let err = fx
            .auth
            .login("http://127.0.0.1:1/api/v1/", "me@example.org", "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, DomovikError::NetworkError));
    }

    #[tokio::test]
    async fn renew_token_replaces_pair() {
        let server = MockServer::start_async().await;
        let renew = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/session/renew")
                    .header("authorization", "r1");
                then.status(200).json_body(token_body("a2", "r2"));
            })
            .await;

        let fx = fixture();
        fx.store
            .set_many(&[
                (keys::SERVER_URL, json!(server.base_url())),
                (keys::RENEWAL_TOKEN, json!("r1")),
                (keys::ACCESS_TOKEN, json!("a1")),
            ])
            .unwrap();

        fx.auth.renew_token().await.unwrap();
        renew.assert_async().await;
        let session = fx.auth.session().unwrap();
        assert_eq!(session.access_token, "a2");
        assert_eq!(session.renewal_token, "r2");
        assert!(session.authorized);
    }

    #[tokio::test]
    async fn renew_rejected_is_renewal_failed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/session/renew");
                then.status(401);
            })
            .await;

        let fx = fixture();
        fx.store
            .set(keys::SERVER_URL, json!(server.base_url()))
            .unwrap();
        assert!(matches!(
            fx.auth.renew_token().await,
            Err(DomovikError::RenewalFailed)
        ));
    }

    #[tokio::test]
    async fn recover_falls_back_to_relogin() {
        let server = MockServer::start_async().await;
        let renew = server
            .mock_async(|when, then| {
                when.method(POST).path("/session/renew");
                then.status(403);
            })
            .await;
        let relogin = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/session")
                    .x_www_form_urlencoded_tuple("user[password]", "stored-api-pw");
                then.status(200).json_body(token_body("a3", "r3"));
            })
            .await;

        let fx = fixture();
        fx.store
            .set_many(&[
                (keys::SERVER_URL, json!(server.base_url())),
                (keys::EMAIL, json!("me@example.org")),
                (keys::API_PASSWORD, json!("stored-api-pw")),
                (keys::AUTHORIZED, json!(true)),
                (keys::ACCESS_TOKEN, json!("a1")),
                (keys::RENEWAL_TOKEN, json!("r1")),
            ])
            .unwrap();

        fx.auth.recover("a1").await.unwrap();
        renew.assert_hits_async(1).await;
        relogin.assert_hits_async(1).await;
        assert_eq!(fx.auth.session().unwrap().access_token, "a3");
    }

    #[tokio::test]
    async fn recover_skips_when_token_already_replaced() {
        let server = MockServer::start_async().await;
        let renew = server
            .mock_async(|when, then| {
                when.method(POST).path("/session/renew");
                then.status(200).json_body(token_body("never", "never"));
            })
            .await;

        let fx = fixture();
        fx.store
            .set_many(&[
                (keys::SERVER_URL, json!(server.base_url())),
                (keys::AUTHORIZED, json!(true)),
                (keys::ACCESS_TOKEN, json!("fresh")),
            ])
            .unwrap();

        fx.auth.recover("stale").await.unwrap();
        renew.assert_hits_async(0).await;
        assert_eq!(fx.auth.session().unwrap().access_token, "fresh");
    }

    #[tokio::test]
    async fn exhausted_recover_revokes_before_releasing() {
        let server = MockServer::start_async().await;
        let renew = server
            .mock_async(|when, then| {
                when.method(POST).path("/session/renew");
                then.status(401);
            })
            .await;
        let relogin = server
            .mock_async(|when, then| {
                when.method(POST).path("/session");
                then.status(401);
            })
            .await;

        let fx = fixture();
        fx.store
            .set_many(&[
                (keys::SERVER_URL, json!(server.base_url())),
                (keys::EMAIL, json!("me@example.org")),
                (keys::API_PASSWORD, json!("stored-api-pw")),
                (keys::AUTHORIZED, json!(true)),
                (keys::ACCESS_TOKEN, json!("a1")),
                (keys::RENEWAL_TOKEN, json!("r1")),
            ])
            .unwrap();

        assert!(matches!(
            fx.auth.recover("a1").await,
            Err(DomovikError::BrowserUnauthorized)
        ));
        assert!(!fx.auth.session().unwrap().authorized);

        // A caller queued behind the failed attempt gets the same outcome.
        assert!(matches!(
            fx.auth.recover("a1").await,
            Err(DomovikError::BrowserUnauthorized)
        ));
        renew.assert_hits_async(1).await;
        relogin.assert_hits_async(1).await;
        assert_eq!(fx.notifier.notices(), vec![Notice::BrowserUnauthorized]);
    }

    #[tokio::test]
    async fn relogin_requires_stored_identity() {
        let fx = fixture();
        assert!(matches!(
            fx.auth.relogin("pw").await,
            Err(DomovikError::NotLinked)
        ));
    }

    #[test]
    fn clear_resets_state_and_menus() {
        let fx = fixture();
        fx.store
            .set_many(&[
                (keys::LINKED, json!(true)),
                (keys::AUTHORIZED, json!(true)),
                (keys::UUID, json!("me")),
                (keys::OTHER_BROWSERS, json!([{"uuid": "p", "name": "P"}])),
            ])
            .unwrap();
        fx.host.set_action_enabled(true);

        fx.auth.clear().unwrap();

        let session = fx.auth.session().unwrap();
        assert!(!session.linked && !session.authorized);
        assert!(session.uuid.is_empty());
        assert_eq!(fx.store.get(keys::OTHER_BROWSERS).unwrap(), Some(json!([])));
        assert!(!fx.host.action_enabled());
        assert!(fx.host.menus().is_empty());
    }

    #[test]
    fn revoke_notifies_and_marks_unauthorized() {
        let fx = fixture();
        fx.store
            .set_many(&[(keys::AUTHORIZED, json!(true)), (keys::LINKED, json!(true))])
            .unwrap();

        fx.auth.revoke().unwrap();

        let session = fx.auth.session().unwrap();
        assert!(!session.authorized);
        assert!(session.linked);
        assert_eq!(session.connection_status, ConnectionStatus::UnAuthorized);
        assert_eq!(fx.notifier.notices(), vec![Notice::BrowserUnauthorized]);
    }
}
