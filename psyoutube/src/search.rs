//! Search proxy over the YouTube Data API v3
//!
//! A stateless passthrough: the query is forwarded as is, at most
//! [`MAX_SEARCH_RESULTS`] videos are requested and the provider order is kept.

use crate::error::{Error, Result};
use crate::models::{SearchResult, watch_url};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default Data API base URL
pub const DEFAULT_DATA_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Upper bound on results per search
pub const MAX_SEARCH_RESULTS: u32 = 10;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("PowerSmart/", env!("CARGO_PKG_VERSION"), " (psyoutube)");

/// YouTube Data API search client
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_results: u32,
}

impl SearchClient {
    pub fn builder() -> SearchClientBuilder {
        SearchClientBuilder::default()
    }

    pub fn max_results(&self) -> u32 {
        self.max_results
    }

    /// Searches videos matching `query`
    ///
    /// An empty query fails with [`Error::QueryMissing`] before any network
    /// call. Every provider failure is reported as [`Error::Upstream`].
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::QueryMissing);
        }

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("youtube.api_key is not set".to_string()))?;

        let mut url = Url::parse(&format!("{}/search", self.base_url.trim_end_matches('/')))?;
        url.query_pairs_mut()
            .append_pair("part", "snippet")
            .append_pair("type", "video")
            .append_pair("maxResults", &self.max_results.to_string())
            .append_pair("q", query)
            .append_pair("key", api_key);

        debug!(query, "Searching YouTube Data API");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Data API search failed");
            return Err(Error::upstream(format!(
                "Data API returned HTTP {}: {}",
                status.as_u16(),
                truncate(&body, 200)
            )));
        }

        let list: SearchListResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("Invalid search response: {}", e)))?;

        Ok(list
            .items
            .into_iter()
            .filter_map(SearchItem::into_result)
            .take(self.max_results as usize)
            .collect())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Builder for [`SearchClient`]
#[derive(Debug, Default)]
pub struct SearchClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    max_results: Option<u32>,
    timeout: Option<Duration>,
}

impl SearchClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Clamped to `1..=MAX_SEARCH_RESULTS`
    pub fn max_results(mut self, max: u32) -> Self {
        self.max_results = Some(max);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<SearchClient> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(self.timeout.unwrap_or(Duration::from_secs(30)))
            .build()?;

        Ok(SearchClient {
            client,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_DATA_API_URL.to_string()),
            api_key: self.api_key,
            max_results: self
                .max_results
                .unwrap_or(MAX_SEARCH_RESULTS)
                .clamp(1, MAX_SEARCH_RESULTS),
        })
    }
}

// ============================================================================
// Data API wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl SearchItem {
    fn into_result(self) -> Option<SearchResult> {
        let id = self.id.video_id?;
        let thumbnails = self.snippet.thumbnails;
        let thumbnail_url = thumbnails
            .medium
            .or(thumbnails.default)
            .map(|t| t.url)
            .unwrap_or_default();

        Some(SearchResult {
            source_url: watch_url(&id),
            id,
            title: self.snippet.title,
            author: self.snippet.channel_title,
            channel_id: self.snippet.channel_id,
            thumbnail_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_query_is_rejected_locally() {
        // Adresse injoignable : un appel réseau échouerait en Upstream
        let client = SearchClient::builder()
            .base_url("http://127.0.0.1:9")
            .api_key(Some("key".to_string()))
            .build()
            .unwrap();

        assert!(matches!(client.search("").await, Err(Error::QueryMissing)));
        assert!(matches!(client.search("   ").await, Err(Error::QueryMissing)));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = SearchClient::builder().api_key(Some(String::new())).build().unwrap();
        let err = client.search("lofi").await.unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_max_results_is_clamped() {
        let client = SearchClient::builder().max_results(50).build().unwrap();
        assert_eq!(client.max_results(), MAX_SEARCH_RESULTS);
        let client = SearchClient::builder().max_results(0).build().unwrap();
        assert_eq!(client.max_results(), 1);
    }

    #[test]
    fn test_item_mapping_skips_channels() {
        let list: SearchListResponse = serde_json::from_value(serde_json::json!({
            "items": [
                {"id": {"kind": "youtube#channel", "channelId": "UCx"}, "snippet": {"title": "Chan"}},
                {"id": {"kind": "youtube#video", "videoId": "vid1"},
                 "snippet": {"title": "T", "channelTitle": "A", "channelId": "UC1",
                             "thumbnails": {"default": {"url": "https://i/d.jpg"}}}}
            ]
        }))
        .unwrap();

        let results: Vec<_> = list.items.into_iter().filter_map(SearchItem::into_result).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].thumbnail_url, "https://i/d.jpg");
        assert_eq!(results[0].source_url, "https://www.youtube.com/watch?v=vid1");
        assert_eq!(truncate("héllo", 2), "hé");
    }
}
