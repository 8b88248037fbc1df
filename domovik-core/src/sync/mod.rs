//! Sync engine: browsers, tabs, bookmarks, reading lists and commands.
//!
//! Every flow checks that this node is linked before touching the network.
//! Entity caches are kept in the store exactly as the relay sent them
//! (encrypted) and decoded on the way out.

mod bookmarks;
mod browsers;
mod commands;
mod lists;
mod search;
mod tabs;

pub use search::SearchSuggestion;

use crate::api::ApiClient;
use crate::config::{ClientConfig, FieldLimits};
use crate::crypto::CryptoBox;
use crate::host::BrowserHost;
use crate::models::{Bookmark, Browser, ListLink, ReadingList, Tab};
use crate::session::Session;
use crate::store::{keys, StateStore};
use crate::{DomovikError, Result};
use std::sync::Arc;

/// Orchestrates the push/pull cycles between this node and the relay.
pub struct SyncEngine {
    api: Arc<ApiClient>,
    store: Arc<dyn StateStore>,
    host: Arc<dyn BrowserHost>,
    crypto: CryptoBox,
    limits: FieldLimits,
}

impl SyncEngine {
    pub fn new(
        config: &ClientConfig,
        api: Arc<ApiClient>,
        store: Arc<dyn StateStore>,
        host: Arc<dyn BrowserHost>,
    ) -> Self {
        Self {
            api,
            crypto: CryptoBox::new(store.clone()),
            store,
            host,
            limits: config.field_limits,
        }
    }

    pub fn crypto(&self) -> &CryptoBox {
        &self.crypto
    }

    /// Fail with `NotLinked` unless this node is linked.
    fn require_linked(&self) -> Result<Session> {
        let session = Session::load(self.store.as_ref())?;
        if !session.linked {
            return Err(DomovikError::NotLinked);
        }
        Ok(session)
    }

    /// The uuid of a linked node.
    fn linked_uuid(&self) -> Result<String> {
        let session = self.require_linked()?;
        session
            .node_uuid()
            .map(str::to_string)
            .ok_or(DomovikError::MissingUuid)
    }

    /// Peers from the local cache, decrypted.
    pub fn cached_peers(&self) -> Result<Vec<Browser>> {
        let peers: Vec<Browser> = self.store.load(keys::OTHER_BROWSERS)?.unwrap_or_default();
        peers.into_iter().map(|b| self.decode_browser(b)).collect()
    }

    pub fn cached_bookmarks(&self) -> Result<Vec<Bookmark>> {
        let bookmarks: Vec<Bookmark> = self.store.load(keys::BOOKMARKS)?.unwrap_or_default();
        bookmarks
            .into_iter()
            .map(|b| self.decode_bookmark(b))
            .collect()
    }

    pub fn cached_lists(&self) -> Result<Vec<ReadingList>> {
        let lists: Vec<ReadingList> = self.store.load(keys::READING_LISTS)?.unwrap_or_default();
        lists.into_iter().map(|l| self.decode_list(l)).collect()
    }

    fn decode_tab(&self, mut tab: Tab) -> Result<Tab> {
        tab.title = self.crypto.decode(Some(&tab.title))?;
        tab.url = self.crypto.decode(Some(&tab.url))?;
        tab.favicon = self.crypto.decode(Some(&tab.favicon))?;
        Ok(tab)
    }

    fn decode_browser(&self, browser: Browser) -> Result<Browser> {
        let tabs = browser
            .tabs
            .into_iter()
            .map(|t| self.decode_tab(t))
            .collect::<Result<Vec<_>>>()?;
        Ok(Browser { tabs, ..browser })
    }

    fn decode_bookmark(&self, mut bookmark: Bookmark) -> Result<Bookmark> {
        bookmark.title = self.crypto.decode(Some(&bookmark.title))?;
        bookmark.url = self.crypto.decode(Some(&bookmark.url))?;
        Ok(bookmark)
    }

    fn decode_list(&self, list: ReadingList) -> Result<ReadingList> {
        let links = list
            .links
            .into_iter()
            .map(|mut link: ListLink| -> Result<ListLink> {
                link.title = self.crypto.decode(Some(&link.title))?;
                link.url = self.crypto.decode(Some(&link.url))?;
                link.favicon = self.crypto.decode(Some(&link.favicon))?;
                Ok(link)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ReadingList { links, ..list })
    }
}
