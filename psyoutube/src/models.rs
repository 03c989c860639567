//! Data models for stream resolution and search

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of a playable stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// Audio track without video
    AudioOnly,
    /// Progressive stream carrying audio and video
    Muxed,
}

impl StreamKind {
    /// Preference rank, lower is preferred
    pub fn rank(self) -> u8 {
        match self {
            StreamKind::AudioOnly => 0,
            StreamKind::Muxed => 1,
        }
    }
}

/// One playable stream offered by the extraction provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCandidate {
    pub url: String,
    /// Bits per second as reported by the provider
    pub bitrate: u64,
    pub kind: StreamKind,
}

impl StreamCandidate {
    pub fn new(url: impl Into<String>, bitrate: u64, kind: StreamKind) -> Self {
        Self {
            url: url.into(),
            bitrate,
            kind,
        }
    }
}

/// Metadata and candidates returned by a provider for one content id
#[derive(Debug, Clone, Default)]
pub struct StreamInfo {
    pub title: String,
    pub uploader_name: String,
    pub duration_seconds: u64,
    pub candidates: Vec<StreamCandidate>,
}

/// Result of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    /// Stream URL, with the `pot` parameter when a token was used
    pub final_url: String,
    pub title: String,
    pub uploader_name: String,
    pub duration_seconds: u64,
    pub token_used: Option<String>,
}

/// Body of `GET /resolve`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub url: String,
    pub title: String,
    pub uploader: String,
    /// Duration in seconds
    pub duration: u64,
    pub po_token_used: Option<String>,
    /// User-Agent the client must send when opening `url`
    pub user_agent: String,
}

impl ResolveResponse {
    pub fn new(stream: ResolvedStream, user_agent: &str) -> Self {
        Self {
            url: stream.final_url,
            title: stream.title,
            uploader: stream.uploader_name,
            duration: stream.duration_seconds,
            po_token_used: stream.token_used,
            user_agent: user_agent.to_string(),
        }
    }
}

/// A normalized search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(rename = "channelId")]
    pub channel_id: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    #[serde(rename = "url")]
    pub source_url: String,
}

/// Public watch page of a video
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_only_ranks_first() {
        assert!(StreamKind::AudioOnly.rank() < StreamKind::Muxed.rank());
    }

    #[test]
    fn test_search_result_wire_names() {
        let result = SearchResult {
            id: "dQw4w9WgXcQ".to_string(),
            title: "Song".to_string(),
            author: "Artist".to_string(),
            channel_id: "UC123".to_string(),
            thumbnail_url: "https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg".to_string(),
            source_url: watch_url("dQw4w9WgXcQ"),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["channelId"], "UC123");
        assert_eq!(json["thumbnail"], "https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg");
        assert_eq!(json["url"], "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert!(json.get("channel_id").is_none());
    }

    #[test]
    fn test_resolve_response_wire_names() {
        let stream = ResolvedStream {
            final_url: "https://r1.googlevideo.com/videoplayback?id=1&pot=tok".to_string(),
            title: "Title".to_string(),
            uploader_name: "Uploader".to_string(),
            duration_seconds: 213,
            token_used: Some("tok".to_string()),
        };
        let json = serde_json::to_value(ResolveResponse::new(stream, "UA")).unwrap();
        assert_eq!(json["uploader"], "Uploader");
        assert_eq!(json["duration"], 213);
        assert_eq!(json["poTokenUsed"], "tok");
        assert_eq!(json["userAgent"], "UA");
    }
}
