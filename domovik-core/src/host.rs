//! The browser surrounding a node.
//!
//! Tab enumeration, bookmarks, context menus, the toolbar action and user
//! notifications all belong to the embedding browser. The engine only talks
//! to them through these traits.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tab as the browser reports it, before any encryption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTab {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub window_id: i64,
}

impl LocalTab {
    /// Only web and ftp pages are worth syncing.
    pub fn is_syncable(&self) -> bool {
        let url = self.url.to_ascii_lowercase();
        url.starts_with("http") || url.starts_with("ftp")
    }
}

/// A node of the browser's bookmark tree. Folders have no `url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkTreeNode {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub children: Vec<BookmarkTreeNode>,
}

impl BookmarkTreeNode {
    /// Collect every URL leaf, depth first. Folder structure is dropped.
    pub fn leaves(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<(String, String)>) {
        match &self.url {
            Some(url) => out.push((self.title.clone(), url.clone())),
            None => {
                for child in &self.children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuContext {
    Page,
    Link,
}

impl MenuContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Link => "link",
        }
    }
}

/// A "send to <peer>" context-menu entry. Its id is `<peer uuid>|<context>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: String,
    pub title: String,
    pub context: MenuContext,
}

impl MenuEntry {
    pub fn for_peer(uuid: &str, name: &str, context: MenuContext) -> Self {
        let title = match context {
            MenuContext::Page => format!("Send page to {}", name),
            MenuContext::Link => format!("Send link to {}", name),
        };
        Self {
            id: format!("{}|{}", uuid, context.as_str()),
            title,
            context,
        }
    }

    /// The peer a menu id points at.
    pub fn target_of(menu_id: &str) -> &str {
        menu_id.split('|').next().unwrap_or(menu_id)
    }
}

/// Browser-side capabilities the engine relies on.
pub trait BrowserHost: Send + Sync {
    /// Every open tab, in every window.
    fn query_tabs(&self) -> Result<Vec<LocalTab>>;

    /// Root of the bookmark tree, if the browser has one.
    fn bookmark_tree(&self) -> Result<Option<BookmarkTreeNode>>;

    fn open_background_tab(&self, url: &str) -> Result<()>;

    fn remove_all_menus(&self);

    fn create_menu(&self, entry: MenuEntry);

    /// Enable or disable the toolbar button.
    fn set_action_enabled(&self, enabled: bool);
}

/// Messages shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    BrowserUnauthorized,
    BrowserRemotelyUnlinked,
    BrowserLinked(String),
    BrowserRenamed(String),
    LogoutSuccessful,
    ErrorSendingLink,
    Error(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrowserUnauthorized => {
                write!(f, "This browser is no longer authorized. Please enter your password again.")
            }
            Self::BrowserRemotelyUnlinked => write!(f, "This browser was unlinked from your account."),
            Self::BrowserLinked(name) => write!(f, "Browser linked as {}", name),
            Self::BrowserRenamed(name) => write!(f, "Browser renamed to {}", name),
            Self::LogoutSuccessful => write!(f, "Browser unlinked."),
            Self::ErrorSendingLink => write!(f, "The link could not be sent."),
            Self::Error(message) => write!(f, "{}", message),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab(url: &str) -> LocalTab {
        LocalTab {
            url: url.to_string(),
            ..LocalTab::default()
        }
    }

    #[test]
    fn syncable_schemes() {
        assert!(tab("https://example.org").is_syncable());
        assert!(tab("HTTP://EXAMPLE.ORG").is_syncable());
        assert!(tab("ftp://mirror.example.org/pub").is_syncable());
        assert!(!tab("about:blank").is_syncable());
        assert!(!tab("chrome://settings").is_syncable());
        assert!(!tab("file:///etc/hosts").is_syncable());
    }

    #[test]
    fn leaves_flatten_folders() {
        let tree = BookmarkTreeNode {
            title: "root".to_string(),
            url: None,
            children: vec![
                BookmarkTreeNode {
                    title: "Toolbar".to_string(),
                    url: None,
                    children: vec![BookmarkTreeNode {
                        title: "Rust".to_string(),
                        url: Some("https://rust-lang.org".to_string()),
                        children: vec![],
                    }],
                },
                BookmarkTreeNode {
                    title: "Docs".to_string(),
                    url: Some("https://docs.rs".to_string()),
                    children: vec![],
                },
                BookmarkTreeNode {
                    title: "Empty folder".to_string(),
                    url: None,
                    children: vec![],
                },
            ],
        };

        assert_eq!(
            tree.leaves(),
            vec![
                ("Rust".to_string(), "https://rust-lang.org".to_string()),
                ("Docs".to_string(), "https://docs.rs".to_string()),
            ]
        );
    }

    #[test]
    fn menu_ids_carry_target() {
        let entry = MenuEntry::for_peer("peer-1", "Desktop", MenuContext::Link);
        assert_eq!(entry.id, "peer-1|link");
        assert_eq!(entry.title, "Send link to Desktop");
        assert_eq!(MenuEntry::target_of(&entry.id), "peer-1");
        assert_eq!(MenuEntry::target_of("bare"), "bare");
    }
}
