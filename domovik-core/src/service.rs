//! Link, re-authorize, unlink and refresh orchestration.
//!
//! [`DomovikService`] wires the store, the credential lifecycle, the request
//! pipeline and the sync engine together; the binaries only talk to it.

use crate::api::ApiClient;
use crate::auth::AuthSession;
use crate::config::ClientConfig;
use crate::host::{BrowserHost, Notice, Notifier};
use crate::models::{Bookmark, Browser, ReadingList};
use crate::session::Session;
use crate::store::{keys, StateStore};
use crate::sync::SyncEngine;
use crate::{DomovikError, Result};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of each flow of one [`DomovikService::refresh`].
#[derive(Debug)]
pub struct RefreshReport {
    pub browsers: Result<Vec<Browser>>,
    pub tabs: Result<usize>,
    pub bookmarks: Result<Vec<Bookmark>>,
    pub lists: Result<Vec<ReadingList>>,
    pub commands: Result<Vec<String>>,
}

impl RefreshReport {
    /// The flows that failed, by name.
    pub fn failures(&self) -> Vec<(&'static str, &DomovikError)> {
        let mut out = Vec::new();
        if let Err(e) = &self.browsers {
            out.push(("browsers", e));
        }
        if let Err(e) = &self.tabs {
            out.push(("tabs", e));
        }
        if let Err(e) = &self.bookmarks {
            out.push(("bookmarks", e));
        }
        if let Err(e) = &self.lists {
            out.push(("lists", e));
        }
        if let Err(e) = &self.commands {
            out.push(("commands", e));
        }
        out
    }

    pub fn is_clean(&self) -> bool {
        self.failures().is_empty()
    }
}

pub struct DomovikService {
    config: ClientConfig,
    store: Arc<dyn StateStore>,
    auth: Arc<AuthSession>,
    api: Arc<ApiClient>,
    sync: SyncEngine,
}

impl DomovikService {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn StateStore>,
        host: Arc<dyn BrowserHost>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        config.validate()?;
        let auth = Arc::new(AuthSession::new(&config, store.clone(), host.clone(), notifier)?);
        let api = Arc::new(ApiClient::new(&config, auth.clone(), store.clone())?);
        let sync = SyncEngine::new(&config, api.clone(), store.clone(), host);

        Ok(Self {
            config,
            store,
            auth,
            api,
            sync,
        })
    }

    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn status(&self) -> Result<Session> {
        Session::load(self.store.as_ref())
    }

    /// Log in, set up the field key, register this node and confirm the link.
    ///
    /// On failure the link flags are reset and the error is returned.
    pub async fn link(
        &self,
        server_url: Option<&str>,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Browser> {
        let server_url = server_url
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(self.config.default_server_url.as_str());

        match self.try_link(server_url, email, password, name).await {
            Ok(browser) => {
                if let Err(e) = self.authorized_hook().await {
                    warn!("Initial sync failed: {}", e);
                }
                Ok(browser)
            }
            Err(e) => {
                warn!("Linking failed: {}", e);
                self.auth.reset_link_flags()?;
                Err(e)
            }
        }
    }

    async fn try_link(
        &self,
        server_url: &str,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Browser> {
        self.auth.login(server_url, email, password).await?;
        self.install_key(password)?;
        self.auth.register_browser(&self.api, name).await?;
        self.auth.check_browser(&self.api).await
    }

    /// Log in again after the session was revoked.
    ///
    /// A password change yields a new field key; caches encrypted under the old
    /// one are dropped.
    pub async fn reauthorize(&self, password: &str) -> Result<Browser> {
        self.auth.relogin(password).await?;
        self.install_key(password)?;
        let browser = self.auth.check_browser(&self.api).await?;
        if let Err(e) = self.authorized_hook().await {
            warn!("Sync after re-authorization failed: {}", e);
        }
        Ok(browser)
    }

    fn install_key(&self, password: &str) -> Result<()> {
        if self
            .sync
            .crypto()
            .set_key(password, &self.config.key_derivation)?
        {
            info!("Field key changed; purging cached entities");
            self.purge_caches()?;
        }
        Ok(())
    }

    fn purge_caches(&self) -> Result<()> {
        self.store.set_many(&[
            (keys::READING_LISTS, json!([])),
            (keys::OTHER_BROWSERS, json!([])),
            (keys::BOOKMARKS, json!([])),
        ])
    }

    /// Enable the toolbar action and run the first full sync, in order.
    pub async fn authorized_hook(&self) -> Result<()> {
        self.auth.authorized_hook();
        self.sync.sync_tabs().await?;
        self.sync.sync_browsers().await?;
        self.sync.sync_bookmarks().await?;
        self.sync.get_commands().await?;
        Ok(())
    }

    pub fn unauthorized_hook(&self) {
        self.auth.unauthorized_hook();
    }

    pub async fn unlink(&self) -> Result<()> {
        self.auth.unlink(&self.api).await?;
        self.auth.notify(Notice::LogoutSuccessful);
        Ok(())
    }

    pub async fn rename(&self, name: &str) -> Result<Browser> {
        let browser = self.auth.rename_browser(&self.api, name).await?;
        self.auth.notify(Notice::BrowserRenamed(browser.name.clone()));
        Ok(browser)
    }

    /// Run every flow concurrently. Flows do not depend on each other.
    pub async fn refresh(&self) -> RefreshReport {
        let (browsers, tabs, bookmarks, lists, commands) = tokio::join!(
            self.sync.sync_browsers(),
            self.sync.sync_tabs(),
            self.sync.sync_bookmarks(),
            self.sync.sync_lists(),
            self.sync.get_commands(),
        );
        let report = RefreshReport {
            browsers,
            tabs,
            bookmarks,
            lists,
            commands,
        };
        for (flow, e) in report.failures() {
            warn!("Refreshing {} failed: {}", flow, e);
        }
        report
    }

    /// One periodic cycle: peers first, then pending commands.
    pub async fn periodic_tick(&self) -> Result<()> {
        self.sync.sync_browsers().await?;
        self.sync.get_commands().await?;
        Ok(())
    }

    /// Run [`periodic_tick`](Self::periodic_tick) every refresh interval
    /// until `shutdown` resolves. Failures are logged and the loop goes on.
    pub async fn run_periodic<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.refresh_interval());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Periodic refresh stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.periodic_tick().await {
                        Ok(()) => debug!("Periodic refresh done"),
                        Err(DomovikError::NotLinked) | Err(DomovikError::NotAuthorized) => {
                            debug!("Skipping periodic refresh: browser not linked or authorized")
                        }
                        Err(e) => warn!("Periodic refresh failed: {}", e),
                    }
                }
            }
        }
    }
}
