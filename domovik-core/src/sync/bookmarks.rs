use super::SyncEngine;
use crate::host::BrowserHost;
use crate::models::{Bookmark, BookmarkUpload};
use crate::store::keys;
use crate::Result;
use reqwest::Method;
use tracing::info;

impl SyncEngine {
    /// Push the flattened bookmark tree, then pull the relay's canonical list
    /// into the cache. Returns the decrypted canonical list.
    pub async fn sync_bookmarks(&self) -> Result<Vec<Bookmark>> {
        let uuid = self.linked_uuid()?;

        let leaves = self
            .host
            .bookmark_tree()?
            .map(|root| root.leaves())
            .unwrap_or_default();
        let bookmarks = leaves
            .iter()
            .map(|(title, url)| -> Result<Bookmark> {
                Ok(Bookmark {
                    title: self
                        .crypto
                        .encode_bounded(Some(title), self.limits.max_title_len)?,
                    url: self
                        .crypto
                        .encode_bounded(Some(url), self.limits.max_url_len)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let upload = BookmarkUpload { uuid, bookmarks };
        self.api
            .execute(Method::PUT, "/bookmarks/", Some(serde_json::to_value(&upload)?))
            .await?;

        let canonical: Vec<Bookmark> = self.api.call(Method::GET, "/bookmarks/", None).await?;
        let decoded = canonical
            .iter()
            .cloned()
            .map(|b| self.decode_bookmark(b))
            .collect::<Result<Vec<_>>>()?;
        self.store.save(keys::BOOKMARKS, &canonical)?;

        info!(
            "Pushed {} bookmarks, relay holds {}",
            upload.bookmarks.len(),
            decoded.len()
        );
        Ok(decoded)
    }
}
