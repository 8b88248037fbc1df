//! Domovik Core Library
//!
//! Keeps the browsing state of several browsers ("nodes") in sync through a
//! relay server. Titles, URLs and favicons are encrypted field by field with a
//! key derived from the user's password, which never leaves the node.
//!
//! The pieces, leaves first:
//! - [`store`]: durable key-value state (session, key material, caches)
//! - [`crypto`]: password derivation and field encryption ([`CryptoBox`])
//! - [`auth`]: credential lifecycle ([`AuthSession`])
//! - [`api`]: authenticated request pipeline ([`ApiClient`])
//! - [`sync`]: browsers, tabs, bookmarks, reading lists and commands ([`SyncEngine`])
//! - [`service`]: link / unlink / refresh orchestration ([`DomovikService`])

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod host;
pub mod models;
pub mod platform;
pub mod service;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod testkit;

pub use api::ApiClient;
pub use auth::AuthSession;
pub use config::{ClientConfig, FieldLimits};
pub use crypto::{CryptoBox, CryptoError, KdfParams};
pub use host::{BookmarkTreeNode, BrowserHost, LocalTab, MenuContext, MenuEntry, Notice, Notifier};
pub use models::{Bookmark, Browser, Command, ListLink, ReadingList, Tab};
pub use service::{DomovikService, RefreshReport};
pub use session::{ConnectionStatus, Session};
pub use snapshot::{LogNotifier, SnapshotHost};
pub use store::{MemoryStore, SqliteStore, StateStore};
pub use sync::{SearchSuggestion, SyncEngine};

use thiserror::Error;

/// Result type for Domovik operations
pub type Result<T> = std::result::Result<T, DomovikError>;

/// General error type for Domovik operations
///
/// The first block mirrors what the relay can tell us; the second block is
/// local failures that never reach the network.
#[derive(Error, Debug)]
pub enum DomovikError {
    #[error("Network error")]
    NetworkError,

    #[error("Check your credentials")]
    CheckCredentials,

    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("Server error")]
    ServerError,

    #[error("No active subscription")]
    NoSubscription,

    #[error("Browser is no longer authorized")]
    BrowserUnauthorized,

    #[error("Browser was unlinked remotely")]
    BrowserRemotelyUnlinked,

    #[error("Re-login failed")]
    ReloginFailed,

    #[error("Error sending link")]
    ErrorSendingLink,

    #[error("Token renewal failed")]
    RenewalFailed,

    #[error("Browser is not authorized")]
    NotAuthorized,

    #[error("Browser is not linked")]
    NotLinked,

    #[error("This browser has no UUID")]
    MissingUuid,

    #[error("Crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<rusqlite::Error> for DomovikError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for DomovikError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(format!("Serialization failed: {}", e))
    }
}
