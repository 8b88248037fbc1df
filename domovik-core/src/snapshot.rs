//! File-backed host for headless nodes.
//!
//! Tabs and bookmarks are read from JSON snapshots that an exporter (or the
//! user) keeps up to date in a directory:
//!
//! - `tabs.json`: an array of [`LocalTab`]
//! - `bookmarks.json`: the root [`BookmarkTreeNode`]
//!
//! URLs received from other nodes are appended to `inbox.txt`, one per line.
//! Menus and the toolbar action have no visible surface and are only logged.

use crate::host::{BookmarkTreeNode, BrowserHost, LocalTab, MenuEntry, Notice, Notifier};
use crate::{DomovikError, Result};
use serde::de::DeserializeOwned;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

pub const TABS_FILE: &str = "tabs.json";
pub const BOOKMARKS_FILE: &str = "bookmarks.json";
pub const INBOX_FILE: &str = "inbox.txt";

pub struct SnapshotHost {
    dir: PathBuf,
    menus: Mutex<Vec<MenuEntry>>,
}

impl SnapshotHost {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            menus: Mutex::new(Vec::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current "send to" menu entries.
    pub fn menus(&self) -> Vec<MenuEntry> {
        self.menus
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            debug!("No snapshot at {}", path.display());
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| DomovikError::Host(format!("Reading {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| DomovikError::Host(format!("Parsing {}: {}", path.display(), e)))
    }
}

impl BrowserHost for SnapshotHost {
    fn query_tabs(&self) -> Result<Vec<LocalTab>> {
        Ok(self.read_json(TABS_FILE)?.unwrap_or_default())
    }

    fn bookmark_tree(&self) -> Result<Option<BookmarkTreeNode>> {
        self.read_json(BOOKMARKS_FILE)
    }

    fn open_background_tab(&self, url: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| DomovikError::Host(format!("Creating {}: {}", self.dir.display(), e)))?;
        let path = self.dir.join(INBOX_FILE);
        let mut inbox = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| DomovikError::Host(format!("Opening {}: {}", path.display(), e)))?;
        writeln!(inbox, "{}", url)
            .map_err(|e| DomovikError::Host(format!("Writing {}: {}", path.display(), e)))?;
        info!("Received {}", url);
        Ok(())
    }

    fn remove_all_menus(&self) {
        if let Ok(mut menus) = self.menus.lock() {
            menus.clear();
        }
    }

    fn create_menu(&self, entry: MenuEntry) {
        debug!("Menu entry {}: {}", entry.id, entry.title);
        if let Ok(mut menus) = self.menus.lock() {
            menus.push(entry);
        }
    }

    fn set_action_enabled(&self, enabled: bool) {
        debug!("Toolbar action {}", if enabled { "enabled" } else { "disabled" });
    }
}

/// Shows notices as log lines.
#[derive(Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::BrowserUnauthorized
            | Notice::BrowserRemotelyUnlinked
            | Notice::ErrorSendingLink
            | Notice::Error(_) => warn!("{}", notice),
            _ => info!("{}", notice),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_snapshots_are_empty() {
        let dir = TempDir::new().unwrap();
        let host = SnapshotHost::new(dir.path());
        assert!(host.query_tabs().unwrap().is_empty());
        assert!(host.bookmark_tree().unwrap().is_none());
    }

    #[test]
    fn reads_snapshots_and_appends_inbox() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(TABS_FILE),
            r#"[{"title": "Rust", "url": "https://rust-lang.org", "window_id": 2}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(BOOKMARKS_FILE),
            r#"{"title": "", "children": [{"title": "Docs", "url": "https://docs.rs"}]}"#,
        )
        .unwrap();

        let host = SnapshotHost::new(dir.path());
        let tabs = host.query_tabs().unwrap();
        assert_eq!(tabs[0].url, "https://rust-lang.org");
        assert_eq!(tabs[0].window_id, 2);
        let tree = host.bookmark_tree().unwrap().unwrap();
        assert_eq!(tree.leaves().len(), 1);

        host.open_background_tab("https://a.example").unwrap();
        host.open_background_tab("https://b.example").unwrap();
        let inbox = fs::read_to_string(dir.path().join(INBOX_FILE)).unwrap();
        assert_eq!(inbox, "https://a.example\nhttps://b.example\n");
    }

    #[test]
    fn malformed_snapshot_is_a_host_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(TABS_FILE), "not json").unwrap();
        let host = SnapshotHost::new(dir.path());
        assert!(matches!(host.query_tabs(), Err(DomovikError::Host(_))));
    }
}
