use super::SyncEngine;
use crate::host::{BrowserHost, MenuContext, MenuEntry};
use crate::models::Browser;
use crate::store::keys;
use crate::Result;
use reqwest::Method;
use tracing::info;

impl SyncEngine {
    /// Refresh the peer list and rebuild the "send to" menus from scratch.
    ///
    /// Returns the decrypted peers, this node excluded.
    pub async fn sync_browsers(&self) -> Result<Vec<Browser>> {
        self.host.remove_all_menus();
        let session = self.require_linked()?;

        let all: Vec<Browser> = self.api.call(Method::GET, "/browsers/", None).await?;
        let peers: Vec<Browser> = all
            .into_iter()
            .filter(|b| b.uuid != session.uuid)
            .collect();

        let decoded = peers
            .iter()
            .cloned()
            .map(|b| self.decode_browser(b))
            .collect::<Result<Vec<_>>>()?;
        self.store.save(keys::OTHER_BROWSERS, &peers)?;

        for peer in &decoded {
            for context in [MenuContext::Page, MenuContext::Link] {
                self.host
                    .create_menu(MenuEntry::for_peer(&peer.uuid, &peer.name, context));
            }
        }

        info!("Synced {} peer browsers", decoded.len());
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::harness;
    use crate::host::{BrowserHost, MenuContext, MenuEntry};
    use crate::store::{keys, StateStore};
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::json;

    #[tokio::test]
    async fn null_favicon_from_relay_is_empty() {
        let server = MockServer::start_async().await;
        let h = harness(&server.base_url());
        let body = json!({"data": [
            {"uuid": "peer-a", "name": "Laptop", "tabs": [
                {"title": h.enc("Rust"), "url": h.enc("https://rust-lang.org"), "favicon": null}
            ]}
        ]});
        server
            .mock_async(|when, then| {
                when.method(GET).path("/browsers/");
                then.status(200).json_body(body);
            })
            .await;

        let peers = h.engine.sync_browsers().await.unwrap();
        assert_eq!(peers[0].tabs[0].favicon, "");
        assert_eq!(peers[0].tabs[0].url, "https://rust-lang.org");
    }

    #[tokio::test]
    async fn excludes_self_and_builds_menus() {
        let server = MockServer::start_async().await;
        let h = harness(&server.base_url());
        let body = json!({"data": [
            {"uuid": "node-1", "name": "Me", "tabs": []},
            {"uuid": "peer-a", "name": "Laptop", "tabs": [
                {"title": h.enc("Rust"), "url": h.enc("https://rust-lang.org"), "favicon": "",
                 "active": true, "pinned": false, "index": 0, "window": 1}
            ]},
            {"uuid": "peer-b", "name": "Phone"}
        ]});
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/browsers/");
                then.status(200).json_body(body);
            })
            .await;

        let first = h.engine.sync_browsers().await.unwrap();
        let menus_first = h.host.menus();
        let second = h.engine.sync_browsers().await.unwrap();

        mock.assert_hits_async(2).await;
        assert_eq!(first, second);
        assert_eq!(menus_first, h.host.menus());

        let uuids: Vec<&str> = first.iter().map(|b| b.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["peer-a", "peer-b"]);
        assert_eq!(first[0].tabs[0].title, "Rust");
        assert_eq!(first[0].tabs[0].url, "https://rust-lang.org");

        let ids: Vec<String> = menus_first.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec!["peer-a|page", "peer-a|link", "peer-b|page", "peer-b|link"]);

        // Cache holds ciphertext, and never this node.
        let cached = h.store.get(keys::OTHER_BROWSERS).unwrap().unwrap();
        assert_ne!(cached[0]["tabs"][0]["url"], json!("https://rust-lang.org"));
        assert!(cached
            .as_array()
            .unwrap()
            .iter()
            .all(|b| b["uuid"] != json!("node-1")));
        assert_eq!(h.engine.cached_peers().unwrap(), first);
    }

    #[tokio::test]
    async fn menus_cleared_even_on_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/browsers/");
                then.status(500);
            })
            .await;

        let h = harness(&server.base_url());
        h.host
            .create_menu(MenuEntry::for_peer("old", "Old", MenuContext::Page));
        assert!(h.engine.sync_browsers().await.is_err());
        assert!(h.host.menus().is_empty());
    }
}
