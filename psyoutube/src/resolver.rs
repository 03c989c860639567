//! Content id to playable URL

use crate::decorator::RequestDecorator;
use crate::error::{Error, Result};
use crate::models::{ResolvedStream, StreamCandidate};
use crate::provider::StreamExtractor;
use std::sync::Arc;
use tracing::{info, warn};

/// Picks the stream to play
///
/// Audio-only streams win over muxed ones; within the preferred kind the
/// highest bitrate wins and the first candidate is kept on ties.
pub fn select_best(candidates: &[StreamCandidate]) -> Option<&StreamCandidate> {
    let best_kind = candidates.iter().map(|c| c.kind).min_by_key(|k| k.rank())?;
    candidates
        .iter()
        .filter(|c| c.kind == best_kind)
        .reduce(|best, c| if c.bitrate > best.bitrate { c } else { best })
}

/// Appends `pot=<token>` to `url`
pub fn append_token(url: &str, token: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}pot={}", url, separator, token)
}

/// Per-call overrides for [`Resolver::resolve_with`]
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Origin token used instead of the configured one
    pub po_token: Option<String>,
    /// New session cookie, stored in the shared decorator; empty clears it
    pub cookies: Option<String>,
}

/// Resolves content ids through a [`StreamExtractor`]
#[derive(Clone)]
pub struct Resolver {
    extractor: Arc<dyn StreamExtractor>,
    decorator: RequestDecorator,
}

impl Resolver {
    pub fn new(extractor: Arc<dyn StreamExtractor>, decorator: RequestDecorator) -> Self {
        Self {
            extractor,
            decorator,
        }
    }

    /// Decorator shared with everything that opens resolved streams
    pub fn decorator(&self) -> &RequestDecorator {
        &self.decorator
    }

    pub async fn resolve(&self, content_id: &str) -> Result<ResolvedStream> {
        self.resolve_with(content_id, ResolveOptions::default()).await
    }

    /// Resolves `content_id` to the best playable stream
    ///
    /// Provider failures come back as [`Error::Extraction`]; an empty
    /// candidate list as [`Error::NoStreams`]. No retry.
    pub async fn resolve_with(
        &self,
        content_id: &str,
        options: ResolveOptions,
    ) -> Result<ResolvedStream> {
        let content_id = content_id.trim();
        if content_id.is_empty() {
            return Err(Error::MissingParameter("id"));
        }

        // un cookie vide efface le précédent
        if let Some(cookies) = options.cookies {
            self.decorator.set_cookie(Some(cookies));
        }

        let decorator = match options.po_token.filter(|t| !t.trim().is_empty()) {
            Some(token) => self.decorator.with_po_token(Some(token)),
            None => self.decorator.clone(),
        };

        let stream_info = self
            .extractor
            .fetch(content_id, &decorator)
            .await
            .map_err(|e| {
                let e = e.into_extraction();
                warn!(content_id, error = %e, "Stream extraction failed");
                e
            })?;

        let best = select_best(&stream_info.candidates)
            .ok_or_else(|| Error::NoStreams(content_id.to_string()))?;

        let final_url = match decorator.po_token() {
            Some(token) => append_token(&best.url, token),
            None => best.url.clone(),
        };

        info!(
            content_id,
            kind = ?best.kind,
            bitrate = best.bitrate,
            "Resolved stream for {}",
            stream_info.title
        );

        Ok(ResolvedStream {
            final_url,
            title: stream_info.title,
            uploader_name: stream_info.uploader_name,
            duration_seconds: stream_info.duration_seconds,
            token_used: decorator.po_token().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StreamInfo, StreamKind};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn audio(url: &str, bitrate: u64) -> StreamCandidate {
        StreamCandidate::new(url, bitrate, StreamKind::AudioOnly)
    }

    fn muxed(url: &str, bitrate: u64) -> StreamCandidate {
        StreamCandidate::new(url, bitrate, StreamKind::Muxed)
    }

    #[test]
    fn test_select_best_prefers_audio_only() {
        let candidates = vec![audio("a1", 128_000), audio("a2", 160_000), muxed("m", 320_000)];
        assert_eq!(select_best(&candidates).unwrap().url, "a2");
    }

    #[test]
    fn test_select_best_falls_back_to_muxed() {
        let candidates = vec![muxed("m1", 96_000), muxed("m2", 192_000)];
        assert_eq!(select_best(&candidates).unwrap().url, "m2");
    }

    #[test]
    fn test_select_best_keeps_first_on_tie() {
        let candidates = vec![audio("first", 128_000), audio("second", 128_000)];
        assert_eq!(select_best(&candidates).unwrap().url, "first");
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_append_token_separator() {
        assert_eq!(
            append_token("https://h/videoplayback?id=1", "T"),
            "https://h/videoplayback?id=1&pot=T"
        );
        assert_eq!(append_token("https://h/videoplayback", "T"), "https://h/videoplayback?pot=T");
    }

    struct FakeExtractor {
        result: Mutex<Option<Result<StreamInfo>>>,
        calls: AtomicUsize,
        seen_token: Mutex<Option<String>>,
    }

    impl FakeExtractor {
        fn new(result: Result<StreamInfo>) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(Some(result)),
                calls: AtomicUsize::new(0),
                seen_token: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl StreamExtractor for FakeExtractor {
        async fn fetch(&self, _id: &str, decorator: &RequestDecorator) -> Result<StreamInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_token.lock().unwrap() = decorator.po_token().map(str::to_string);
            self.result.lock().unwrap().take().unwrap()
        }
    }

    fn info(candidates: Vec<StreamCandidate>) -> StreamInfo {
        StreamInfo {
            title: "Song".to_string(),
            uploader_name: "Band".to_string(),
            duration_seconds: 180,
            candidates,
        }
    }

    #[tokio::test]
    async fn test_resolve_appends_configured_token() {
        let extractor = FakeExtractor::new(Ok(info(vec![audio("https://h/v?id=1", 1)])));
        let resolver = Resolver::new(extractor.clone(), RequestDecorator::new(Some("cfg".into())));

        let stream = resolver.resolve("abc").await.unwrap();
        assert_eq!(stream.final_url, "https://h/v?id=1&pot=cfg");
        assert_eq!(stream.token_used.as_deref(), Some("cfg"));
        assert_eq!(stream.title, "Song");
        assert_eq!(stream.duration_seconds, 180);
    }

    #[tokio::test]
    async fn test_resolve_overrides_token_and_cookie() {
        let extractor = FakeExtractor::new(Ok(info(vec![muxed("https://h/v", 1)])));
        let decorator = RequestDecorator::new(Some("cfg".into()));
        let resolver = Resolver::new(extractor.clone(), decorator.clone());

        let stream = resolver
            .resolve_with(
                "abc",
                ResolveOptions {
                    po_token: Some("call".into()),
                    cookies: Some("SID=9".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(stream.final_url, "https://h/v?pot=call");
        assert_eq!(extractor.seen_token.lock().unwrap().as_deref(), Some("call"));
        assert_eq!(decorator.cookie().as_deref(), Some("SID=9"));
        assert_eq!(decorator.po_token(), Some("cfg"));
    }

    #[tokio::test]
    async fn test_resolve_with_empty_cookie_clears_it() {
        let extractor = FakeExtractor::new(Ok(info(vec![audio("https://h/v", 1)])));
        let decorator = RequestDecorator::new(None).with_cookie(Some("SID=1".into()));
        let resolver = Resolver::new(extractor, decorator.clone());

        resolver
            .resolve_with(
                "abc",
                ResolveOptions {
                    po_token: None,
                    cookies: Some(String::new()),
                },
            )
            .await
            .unwrap();
        assert!(decorator.cookie().is_none());

        // absent: le cookie courant reste
        decorator.set_cookie(Some("SID=2".into()));
        let extractor = FakeExtractor::new(Ok(info(vec![audio("https://h/v", 1)])));
        let resolver = Resolver::new(extractor, decorator.clone());
        resolver.resolve("abc").await.unwrap();
        assert_eq!(decorator.cookie().as_deref(), Some("SID=2"));
    }

    #[tokio::test]
    async fn test_resolve_without_token_leaves_url() {
        let extractor = FakeExtractor::new(Ok(info(vec![audio("https://h/v?id=1", 1)])));
        let resolver = Resolver::new(extractor, RequestDecorator::new(None));

        let stream = resolver.resolve("abc").await.unwrap();
        assert_eq!(stream.final_url, "https://h/v?id=1");
        assert!(stream.token_used.is_none());
    }

    #[tokio::test]
    async fn test_resolve_no_streams() {
        let extractor = FakeExtractor::new(Ok(info(vec![])));
        let resolver = Resolver::new(extractor, RequestDecorator::new(None));

        let err = resolver.resolve("abc").await.unwrap_err();
        assert!(matches!(&err, Error::NoStreams(id) if id == "abc"));
        assert_eq!(err.code(), "NO_STREAMS");
    }

    #[tokio::test]
    async fn test_resolve_wraps_provider_failure() {
        let extractor = FakeExtractor::new(Err(Error::upstream("boom")));
        let resolver = Resolver::new(extractor, RequestDecorator::new(None));

        let err = resolver.resolve("abc").await.unwrap_err();
        assert_eq!(err.code(), "EXTRACTION_EXCEPTION");
    }

    #[tokio::test]
    async fn test_resolve_rejects_blank_id_without_fetching() {
        let extractor = FakeExtractor::new(Ok(info(vec![])));
        let resolver = Resolver::new(extractor.clone(), RequestDecorator::new(None));

        let err = resolver.resolve("  ").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }
}
