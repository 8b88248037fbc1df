//! Wire models shared with the relay.
//!
//! The same structs carry encrypted fields (on the wire and in the local
//! cache) and plaintext fields (after [`CryptoBox::decode`]); which one a
//! value holds is a matter of where it is in the pipeline.
//!
//! [`CryptoBox::decode`]: crate::crypto::CryptoBox::decode

use serde::{Deserialize, Deserializer, Serialize};

/// Read a missing or `null` field as its default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Every relay response wraps its payload in `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// A registered node: this browser or one of its peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Browser {
    pub uuid: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tabs: Vec<Tab>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub favicon: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub window: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingList {
    pub name: String,
    pub uuid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<ListLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListLink {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub favicon: String,
    pub id: i64,
}

/// A queued instruction for another node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub op: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

/// Operations a node knows how to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOp {
    Open,
    Unknown(String),
}

impl Command {
    pub const OPEN: &'static str = "open";

    pub fn open(encrypted_url: String) -> Self {
        Self {
            op: Self::OPEN.to_string(),
            url: encrypted_url,
        }
    }

    pub fn kind(&self) -> CommandOp {
        match self.op.as_str() {
            Self::OPEN => CommandOp::Open,
            other => CommandOp::Unknown(other.to_string()),
        }
    }
}

/// Access and renewal token pair returned by `/session` and `/session/renew`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub renewal_token: String,
}

/// Body of `POST /browsers/tabs/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub uuid: String,
    pub timestamp: i64,
    pub tabs: Vec<Tab>,
}

/// Body of `PUT /bookmarks/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkUpload {
    pub uuid: String,
    pub bookmarks: Vec<Bookmark>,
}

/// Body of `POST /browsers/:uuid/command`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandUpload {
    pub target: String,
    pub command: Command,
}

/// Body of `POST /browsers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterBrowser {
    pub name: String,
}

/// Body of `PATCH /browsers/:uuid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameBrowser {
    pub uuid: String,
    pub name: String,
}

/// Body of `POST /lists/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewList {
    pub name: String,
}

/// Body of `POST /lists/:uuid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListLink {
    pub link: LinkFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkFields {
    pub url: String,
    pub title: String,
    pub favicon: String,
}
