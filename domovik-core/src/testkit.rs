//! In-memory host doubles.
//!
//! Used by the unit and integration tests, and by headless setups that have
//! no real browser to drive.

use crate::host::{BookmarkTreeNode, BrowserHost, LocalTab, MenuEntry, Notice, Notifier};
use crate::{DomovikError, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A browser whose tabs and bookmarks are set by hand and whose side effects
/// are recorded.
#[derive(Default)]
pub struct RecordingHost {
    tabs: Mutex<Vec<LocalTab>>,
    bookmarks: Mutex<Option<BookmarkTreeNode>>,
    opened: Mutex<Vec<String>>,
    menus: Mutex<Vec<MenuEntry>>,
    action_enabled: Mutex<bool>,
    refused: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tabs(&self, tabs: Vec<LocalTab>) {
        *lock(&self.tabs) = tabs;
    }

    pub fn set_bookmarks(&self, root: BookmarkTreeNode) {
        *lock(&self.bookmarks) = Some(root);
    }

    /// Make opening `url` fail with a host error.
    pub fn refuse_url(&self, url: &str) {
        lock(&self.refused).push(url.to_string());
    }

    /// URLs opened in background tabs, in order.
    pub fn opened(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }

    pub fn menus(&self) -> Vec<MenuEntry> {
        lock(&self.menus).clone()
    }

    pub fn action_enabled(&self) -> bool {
        *lock(&self.action_enabled)
    }
}

impl BrowserHost for RecordingHost {
    fn query_tabs(&self) -> Result<Vec<LocalTab>> {
        Ok(lock(&self.tabs).clone())
    }

    fn bookmark_tree(&self) -> Result<Option<BookmarkTreeNode>> {
        Ok(lock(&self.bookmarks).clone())
    }

    fn open_background_tab(&self, url: &str) -> Result<()> {
        if lock(&self.refused).iter().any(|u| u == url) {
            return Err(DomovikError::Host(format!("Cannot open {}", url)));
        }
        lock(&self.opened).push(url.to_string());
        Ok(())
    }

    fn remove_all_menus(&self) {
        lock(&self.menus).clear();
    }

    fn create_menu(&self, entry: MenuEntry) {
        lock(&self.menus).push(entry);
    }

    fn set_action_enabled(&self, enabled: bool) {
        *lock(&self.action_enabled) = enabled;
    }
}

/// Collects notices instead of showing them.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        lock(&self.notices).push(notice);
    }
}
