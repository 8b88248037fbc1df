use super::SyncEngine;
use crate::host::{BrowserHost, LocalTab, MenuEntry, Notice};
use crate::models::{Command, CommandOp, CommandUpload};
use crate::{DomovikError, Result};
use reqwest::Method;
use tracing::{info, warn};

impl SyncEngine {
    /// Pull the commands queued for this node and apply them.
    ///
    /// Returns the URLs opened. The relay dequeues the whole batch at once, so
    /// a command that cannot be applied is logged and skipped.
    pub async fn get_commands(&self) -> Result<Vec<String>> {
        let uuid = self.linked_uuid()?;

        let commands: Vec<Command> = self
            .api
            .call(Method::GET, &format!("/browsers/{}/command", uuid), None)
            .await?;

        let mut opened = Vec::new();
        for command in commands {
            match command.kind() {
                CommandOp::Open => {
                    let url = match self.crypto.decode(Some(&command.url)) {
                        Ok(url) if !url.is_empty() => url,
                        Ok(_) => continue,
                        Err(e) => {
                            warn!("Skipping undecodable open command: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = self.host.open_background_tab(&url) {
                        warn!("Could not open a tab sent from another browser: {}", e);
                        continue;
                    }
                    opened.push(url);
                }
                CommandOp::Unknown(op) => warn!("Unknown operation {}", op),
            }
        }

        if !opened.is_empty() {
            info!("Opened {} tabs sent from other browsers", opened.len());
        }
        Ok(opened)
    }

    /// Ask `target` to open `url`.
    ///
    /// Any failure is shown to the user and reported as `ErrorSendingLink`.
    pub async fn send_command(&self, target: &str, url: &str) -> Result<()> {
        let uuid = self.linked_uuid()?;

        let result = self.push_command(&uuid, target, url).await;
        if let Err(e) = result {
            warn!("Could not send {} to {}: {}", url, target, e);
            self.api.auth().notify(Notice::ErrorSendingLink);
            return Err(DomovikError::ErrorSendingLink);
        }
        Ok(())
    }

    async fn push_command(&self, uuid: &str, target: &str, url: &str) -> Result<()> {
        let upload = CommandUpload {
            target: target.to_string(),
            command: Command::open(self.crypto.encode(Some(url))?),
        };
        self.api
            .execute(
                Method::POST,
                &format!("/browsers/{}/command", uuid),
                Some(serde_json::to_value(&upload)?),
            )
            .await
    }

    /// Send the page of a popup tab to a peer. A tab without a URL is ignored.
    pub async fn send_tab_to_browser(&self, target: &str, tab: &LocalTab) -> Result<()> {
        if tab.url.is_empty() {
            return Ok(());
        }
        self.send_command(target, &tab.url).await
    }

    /// Handle a "send to" context-menu click. The link under the cursor wins
    /// over the page itself.
    pub async fn send_from_menu(
        &self,
        menu_id: &str,
        page_url: Option<&str>,
        link_url: Option<&str>,
    ) -> Result<()> {
        let url = link_url
            .filter(|u| !u.is_empty())
            .or(page_url.filter(|u| !u.is_empty()));
        match url {
            Some(url) => self.send_command(MenuEntry::target_of(menu_id), url).await,
            None => Ok(()),
        }
    }
}
