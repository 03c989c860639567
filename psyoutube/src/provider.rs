//! Stream metadata providers
//!
//! [`StreamExtractor`] is the seam between the resolver and whatever knows
//! how to list the streams of a video. [`InnerTubeExtractor`] queries the
//! `youtubei/v1/player` endpoint used by the official clients.

use crate::decorator::RequestDecorator;
use crate::error::{Error, Result};
use crate::models::{StreamCandidate, StreamInfo, StreamKind};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default InnerTube host
pub const DEFAULT_INNERTUBE_URL: &str = "https://www.youtube.com";

/// Default client identity reported to InnerTube
pub const DEFAULT_CLIENT_NAME: &str = "ANDROID";
pub const DEFAULT_CLIENT_VERSION: &str = "19.44.38";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Lists the playable streams of a content id
#[async_trait]
pub trait StreamExtractor: Send + Sync {
    /// Fetches metadata and stream candidates
    ///
    /// Outbound requests must go through `decorator`.
    async fn fetch(&self, content_id: &str, decorator: &RequestDecorator) -> Result<StreamInfo>;
}

/// InnerTube player endpoint client
#[derive(Debug, Clone)]
pub struct InnerTubeExtractor {
    client: Client,
    base_url: String,
    client_name: String,
    client_version: String,
}

impl InnerTubeExtractor {
    /// Create an extractor with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> InnerTubeExtractorBuilder {
        InnerTubeExtractorBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn player_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/youtubei/v1/player",
            self.base_url.trim_end_matches('/')
        ))?;
        url.query_pairs_mut().append_pair("prettyPrint", "false");
        Ok(url)
    }

    fn player_request_body(&self, content_id: &str) -> serde_json::Value {
        serde_json::json!({
            "context": {
                "client": {
                    "clientName": self.client_name,
                    "clientVersion": self.client_version,
                    "hl": "en",
                    "gl": "US",
                }
            },
            "videoId": content_id,
            "contentCheckOk": true,
            "racyCheckOk": true,
        })
    }
}

#[async_trait]
impl StreamExtractor for InnerTubeExtractor {
    async fn fetch(&self, content_id: &str, decorator: &RequestDecorator) -> Result<StreamInfo> {
        let request = self
            .client
            .post(self.player_url()?)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            // reqwest ne décompresse pas quand Accept-Encoding est posé à la main
            .header(ACCEPT_ENCODING, HeaderValue::from_static("identity"))
            .json(&self.player_request_body(content_id))
            .build()?;
        let request = decorator.decorate(request);

        debug!(content_id, "Fetching InnerTube player response");
        let response = self.client.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::extraction(
                "HttpStatusError",
                format!("InnerTube player endpoint returned HTTP {}", status.as_u16()),
            ));
        }

        let player: PlayerResponse = response.json().await?;
        player.into_stream_info()
    }
}

/// Builder for [`InnerTubeExtractor`]
#[derive(Debug, Default)]
pub struct InnerTubeExtractorBuilder {
    base_url: Option<String>,
    client_name: Option<String>,
    client_version: Option<String>,
    timeout: Option<Duration>,
    client: Option<Client>,
}

impl InnerTubeExtractorBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    pub fn client_version(mut self, version: impl Into<String>) -> Self {
        self.client_version = Some(version.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use an existing reqwest client (the timeout setting is then ignored)
    pub fn http_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<InnerTubeExtractor> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(
                    self.timeout
                        .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
                )
                .build()?,
        };

        Ok(InnerTubeExtractor {
            client,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_INNERTUBE_URL.to_string()),
            client_name: self
                .client_name
                .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
            client_version: self
                .client_version
                .unwrap_or_else(|| DEFAULT_CLIENT_VERSION.to_string()),
        })
    }
}

// ============================================================================
// InnerTube wire format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    streaming_data: Option<StreamingData>,
    video_details: Option<VideoDetails>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingData {
    #[serde(default)]
    formats: Vec<Format>,
    #[serde(default)]
    adaptive_formats: Vec<Format>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Format {
    url: Option<String>,
    #[serde(default)]
    mime_type: String,
    bitrate: Option<u64>,
    average_bitrate: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    length_seconds: Option<String>,
}

impl Format {
    fn bitrate(&self) -> u64 {
        self.bitrate.or(self.average_bitrate).unwrap_or(0)
    }

    fn candidate(self, kind: StreamKind) -> Option<StreamCandidate> {
        let bitrate = self.bitrate();
        match self.url {
            Some(url) if !url.is_empty() => Some(StreamCandidate::new(url, bitrate, kind)),
            // Format chiffré (signatureCipher) : non exploitable sans déchiffrement
            _ => None,
        }
    }
}

impl PlayerResponse {
    fn into_stream_info(self) -> Result<StreamInfo> {
        if let Some(playability) = &self.playability_status {
            if playability.status != "OK" {
                return Err(Error::extraction(
                    playability_class(&playability.status),
                    playability
                        .reason
                        .clone()
                        .unwrap_or_else(|| playability.status.clone()),
                ));
            }
        }

        let details = self.video_details;
        let streaming = self.streaming_data.unwrap_or_default();

        let muxed = streaming
            .formats
            .into_iter()
            .filter_map(|f| f.candidate(StreamKind::Muxed));
        let audio = streaming
            .adaptive_formats
            .into_iter()
            .filter(|f| f.mime_type.starts_with("audio/"))
            .filter_map(|f| f.candidate(StreamKind::AudioOnly));

        let candidates: Vec<StreamCandidate> = audio.chain(muxed).collect();
        debug!(count = candidates.len(), "InnerTube stream candidates");

        Ok(match details {
            Some(d) => StreamInfo {
                title: d.title,
                uploader_name: d.author,
                duration_seconds: d
                    .length_seconds
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0),
                candidates,
            },
            None => StreamInfo {
                candidates,
                ..Default::default()
            },
        })
    }
}

fn playability_class(status: &str) -> &'static str {
    match status {
        "LOGIN_REQUIRED" => "LoginRequiredException",
        "AGE_CHECK_REQUIRED" | "CONTENT_CHECK_REQUIRED" => "AgeRestrictedContentException",
        "UNPLAYABLE" => "ContentNotAvailableException",
        "ERROR" => "ContentNotAvailableException",
        _ => "ExtractionException",
    }
}
