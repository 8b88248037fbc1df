//! Typed view over the credential part of the local state.

use crate::store::{keys, StateStore};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Result of the last API call, for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "networkError")]
    NetworkError,
    #[serde(rename = "unAuthorized")]
    UnAuthorized,
    #[serde(rename = "unSubscribed")]
    UnSubscribed,
    #[serde(rename = "serverError")]
    ServerError,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NetworkError => "networkError",
            Self::UnAuthorized => "unAuthorized",
            Self::UnSubscribed => "unSubscribed",
            Self::ServerError => "serverError",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the session credentials and link state.
///
/// `linked` implies a non-empty `uuid`; `authorized` implies non-empty tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub connected: bool,
    pub authorized: bool,
    pub linked: bool,
    pub server_url: String,
    pub email: String,
    #[serde(skip)]
    pub api_password: String,
    #[serde(skip)]
    pub access_token: String,
    #[serde(skip)]
    pub renewal_token: String,
    pub uuid: String,
    pub browser_name: String,
    pub connection_status: ConnectionStatus,
}

impl Session {
    pub fn load(store: &dyn StateStore) -> Result<Self> {
        Ok(Self {
            connected: store.flag(keys::CONNECTED)?,
            authorized: store.flag(keys::AUTHORIZED)?,
            linked: store.flag(keys::LINKED)?,
            server_url: store.text(keys::SERVER_URL)?,
            email: store.text(keys::EMAIL)?,
            api_password: store.text(keys::API_PASSWORD)?,
            access_token: store.text(keys::ACCESS_TOKEN)?,
            renewal_token: store.text(keys::RENEWAL_TOKEN)?,
            uuid: store.text(keys::UUID)?,
            browser_name: store.text(keys::BROWSER_NAME)?,
            connection_status: store
                .load::<ConnectionStatus>(keys::CONNECTION_STATUS)?
                .unwrap_or_default(),
        })
    }

    /// Whether requests may be issued at all.
    pub fn is_authorized(&self) -> bool {
        self.authorized && !self.access_token.is_empty()
    }

    /// Whether sync flows may run.
    pub fn is_linked(&self) -> bool {
        self.linked && !self.uuid.is_empty()
    }

    /// The uuid of this node, if it has one.
    pub fn node_uuid(&self) -> Option<&str> {
        if self.uuid.is_empty() {
            None
        } else {
            Some(&self.uuid)
        }
    }

    /// Entries that return a store to the unlinked baseline.
    ///
    /// Covers credentials, key material and every cached entity list.
    pub fn cleared_entries() -> Vec<(&'static str, Value)> {
        vec![
            (keys::CONNECTED, json!(false)),
            (keys::LINKED, json!(false)),
            (keys::AUTHORIZED, json!(false)),
            (keys::SERVER_URL, json!("")),
            (keys::EMAIL, json!("")),
            (keys::API_PASSWORD, json!("")),
            (keys::ACCESS_TOKEN, json!("")),
            (keys::RENEWAL_TOKEN, json!("")),
            (keys::UUID, json!("")),
            (keys::BROWSER_NAME, json!("")),
            (keys::READING_LISTS, json!([])),
            (keys::OTHER_BROWSERS, json!([])),
            (keys::BOOKMARKS, json!([])),
            (keys::EK, Value::Null),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn connection_status_wire_names() {
        for status in [
            ConnectionStatus::Ok,
            ConnectionStatus::NetworkError,
            ConnectionStatus::UnAuthorized,
            ConnectionStatus::UnSubscribed,
            ConnectionStatus::ServerError,
        ] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, json!(status.as_str()));
            let back: ConnectionStatus = serde_json::from_value(json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn empty_store_is_unlinked() {
        let store = MemoryStore::new();
        let session = Session::load(&store).unwrap();
        assert_eq!(session, Session::default());
        assert!(!session.is_linked());
        assert!(!session.is_authorized());
        assert!(session.node_uuid().is_none());
    }

    #[test]
    fn cleared_entries_reset_everything() {
        let store = MemoryStore::new();
        store
            .set_many(&[
                (keys::LINKED, json!(true)),
                (keys::AUTHORIZED, json!(true)),
                (keys::UUID, json!("n1")),
                (keys::ACCESS_TOKEN, json!("t")),
                (keys::CONNECTION_STATUS, json!("serverError")),
            ])
            .unwrap();

        let loaded = Session::load(&store).unwrap();
        assert!(loaded.is_linked());
        assert_eq!(loaded.connection_status, ConnectionStatus::ServerError);

        store.set_many(&Session::cleared_entries()).unwrap();
        let cleared = Session::load(&store).unwrap();
        assert!(!cleared.linked);
        assert!(!cleared.authorized);
        assert!(cleared.uuid.is_empty());
        assert!(cleared.access_token.is_empty());
    }

    #[test]
    fn secrets_not_serialized() {
        let session = Session {
            api_password: "p".to_string(),
            access_token: "a".to_string(),
            renewal_token: "r".to_string(),
            ..Session::default()
        };
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("api_password").is_none());
        assert!(json.get("access_token").is_none());
        assert!(json.get("renewal_token").is_none());
    }
}
