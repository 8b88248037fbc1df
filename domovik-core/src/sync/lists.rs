use super::SyncEngine;
use crate::host::LocalTab;
use crate::models::{LinkFields, NewList, NewListLink, ReadingList};
use crate::store::keys;
use crate::{DomovikError, Result};
use reqwest::Method;
use serde::Deserialize;
use tracing::info;

#[derive(Deserialize)]
struct CreatedList {
    uuid: String,
}

impl SyncEngine {
    /// Pull every reading list into the cache. Returns them decrypted.
    pub async fn sync_lists(&self) -> Result<Vec<ReadingList>> {
        self.require_linked()?;

        let lists: Vec<ReadingList> = self.api.call(Method::GET, "/lists/", None).await?;
        let decoded = lists
            .iter()
            .cloned()
            .map(|l| self.decode_list(l))
            .collect::<Result<Vec<_>>>()?;
        self.store.save(keys::READING_LISTS, &lists)?;
        Ok(decoded)
    }

    /// Create a reading list and return its uuid.
    pub async fn create_list(&self, name: &str) -> Result<String> {
        self.require_linked()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(DomovikError::InvalidInput("List name is empty".to_string()));
        }

        let body = serde_json::to_value(NewList {
            name: name.to_string(),
        })?;
        let created: CreatedList = self.api.call(Method::POST, "/lists/", Some(body)).await?;
        info!("Created reading list {} ({})", name, created.uuid);
        Ok(created.uuid)
    }

    /// Save a page into a reading list.
    pub async fn add_link_to_list(&self, list_uuid: &str, tab: &LocalTab) -> Result<()> {
        self.require_linked()?;
        if tab.url.is_empty() {
            return Err(DomovikError::InvalidInput("Nothing to save".to_string()));
        }

        let link = LinkFields {
            url: self
                .crypto
                .encode_bounded(Some(&tab.url), self.limits.max_url_len)?,
            title: self
                .crypto
                .encode_bounded(tab.title.as_deref(), self.limits.max_title_len)?,
            favicon: self
                .crypto
                .encode_bounded(tab.fav_icon_url.as_deref(), self.limits.max_favicon_len)?,
        };
        let body = serde_json::to_value(NewListLink { link })?;
        self.api
            .execute(Method::POST, &format!("/lists/{}", list_uuid), Some(body))
            .await
    }

    pub async fn remove_link_from_list(&self, list_uuid: &str, link_id: i64) -> Result<()> {
        self.require_linked()?;
        self.api
            .execute(
                Method::DELETE,
                &format!("/lists/{}/{}", list_uuid, link_id),
                None,
            )
            .await
    }
}
