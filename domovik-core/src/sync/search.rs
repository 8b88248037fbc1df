use super::SyncEngine;
use crate::Result;
use serde::Serialize;

/// A match for address-bar search: the URL to open and what to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSuggestion {
    pub content: String,
    pub description: String,
}

fn matches_all(keywords: &[String], title: &str, url: &str) -> bool {
    let title = title.to_lowercase();
    let url = url.to_lowercase();
    keywords
        .iter()
        .all(|kw| title.contains(kw.as_str()) || url.contains(kw.as_str()))
}

impl SyncEngine {
    /// Search peer tabs, then bookmarks, from the local cache.
    ///
    /// Every whitespace-separated keyword must occur, case-insensitively, in
    /// the title or the URL.
    pub fn search(&self, text: &str) -> Result<Vec<SearchSuggestion>> {
        let keywords: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
        let mut suggestions = Vec::new();

        for peer in self.cached_peers()? {
            for tab in &peer.tabs {
                if matches_all(&keywords, &tab.title, &tab.url) {
                    suggestions.push(SearchSuggestion {
                        content: tab.url.clone(),
                        description: format!("{} (tab from {})", tab.title, peer.name),
                    });
                }
            }
        }

        for bookmark in self.cached_bookmarks()? {
            if matches_all(&keywords, &bookmark.title, &bookmark.url) {
                suggestions.push(SearchSuggestion {
                    description: format!("{} (bookmark)", bookmark.title),
                    content: bookmark.url,
                });
            }
        }

        Ok(suggestions)
    }
}
