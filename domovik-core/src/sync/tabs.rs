use super::SyncEngine;
use crate::host::{BrowserHost, LocalTab};
use crate::models::{Tab, TabSnapshot};
use crate::Result;
use reqwest::Method;
use tracing::debug;

/// Snapshot timestamp with a resolution of 100 seconds. Used for ordering only.
pub(crate) fn coarse_timestamp() -> i64 {
    chrono::Utc::now().timestamp() / 100
}

impl SyncEngine {
    /// Push every web tab of this node, replacing the previous snapshot.
    ///
    /// Returns the number of tabs sent.
    pub async fn sync_tabs(&self) -> Result<usize> {
        let uuid = self.linked_uuid()?;

        let tabs = self
            .host
            .query_tabs()?
            .iter()
            .filter(|t| t.is_syncable())
            .map(|t| self.encode_tab(t))
            .collect::<Result<Vec<_>>>()?;
        let count = tabs.len();

        let snapshot = TabSnapshot {
            uuid,
            timestamp: coarse_timestamp(),
            tabs,
        };
        self.api
            .execute(
                Method::POST,
                "/browsers/tabs/",
                Some(serde_json::to_value(&snapshot)?),
            )
            .await?;

        debug!("Pushed {} tabs", count);
        Ok(count)
    }

    /// Encrypt one tab. Oversize fields are sent empty, never truncated.
    pub(crate) fn encode_tab(&self, tab: &LocalTab) -> Result<Tab> {
        Ok(Tab {
            title: self
                .crypto
                .encode_bounded(tab.title.as_deref(), self.limits.max_title_len)?,
            url: self
                .crypto
                .encode_bounded(Some(&tab.url), self.limits.max_url_len)?,
            favicon: self
                .crypto
                .encode_bounded(tab.fav_icon_url.as_deref(), self.limits.max_favicon_len)?,
            active: tab.active,
            pinned: tab.pinned,
            index: tab.index,
            window: tab.window_id,
        })
    }
}
