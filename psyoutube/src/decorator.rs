//! Request decoration for outbound YouTube traffic
//!
//! Every request sent to the extraction provider or to a media host goes
//! through [`RequestDecorator`]. Headers are layered in a fixed order, later
//! layers replacing earlier values for the same name:
//!
//! 1. browser identification headers
//! 2. the session cookie, when one is set
//! 3. origin token, `Origin` and `Referer`, for YouTube and googlevideo hosts
//! 4. the caller's own headers
//!
//! Decoration performs no I/O. The cookie slot is shared between clones and
//! follows last-write-wins.

use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use std::sync::{Arc, RwLock};
use tracing::warn;
use url::Url;

/// Desktop browser identity sent with every request
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36";

/// User-Agent handed to clients that open resolved URLs themselves
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 13; SM-A266B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Mobile Safari/537.36";

/// Header carrying the origin-attestation token
pub const PO_TOKEN_HEADER: &str = "x-youtube-po-token";

/// Origin announced to YouTube hosts
pub const YOUTUBE_ORIGIN: &str = "https://www.youtube.com";

const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("accept-encoding", "gzip, deflate, br"),
    ("dnt", "1"),
    ("connection", "keep-alive"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    (
        "sec-ch-ua",
        "\"Chromium\";v=\"140\", \"Google Chrome\";v=\"140\", \"Not-A.Brand\";v=\"99\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
];

/// True for `youtube.com`, `googlevideo.com` and their subdomains
pub fn is_youtube_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    ["youtube.com", "googlevideo.com"]
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
}

/// Adds browser, cookie and origin headers to outbound requests
#[derive(Debug, Clone, Default)]
pub struct RequestDecorator {
    cookie: Arc<RwLock<Option<String>>>,
    po_token: Option<String>,
}

impl RequestDecorator {
    /// Decorator with an optional origin token and no cookie
    pub fn new(po_token: Option<String>) -> Self {
        Self {
            cookie: Arc::new(RwLock::new(None)),
            po_token: po_token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn with_cookie(self, cookie: Option<String>) -> Self {
        self.set_cookie(cookie);
        self
    }

    /// Same cookie slot, different origin token
    pub fn with_po_token(&self, po_token: Option<String>) -> Self {
        Self {
            cookie: Arc::clone(&self.cookie),
            po_token: po_token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Replaces the session cookie; an empty string clears it
    pub fn set_cookie(&self, cookie: Option<String>) {
        let cookie = cookie.filter(|c| !c.trim().is_empty());
        *self.cookie.write().unwrap_or_else(|e| e.into_inner()) = cookie;
    }

    pub fn cookie(&self) -> Option<String> {
        self.cookie
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn po_token(&self) -> Option<&str> {
        self.po_token.as_deref()
    }

    /// Fixed browser identification headers
    pub fn browser_headers() -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(BROWSER_HEADERS.len() + 1);
        headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_USER_AGENT));
        for &(name, value) in BROWSER_HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        headers
    }

    /// Headers to send to `url`, `caller` headers taking precedence
    ///
    /// `caller` is left untouched. A caller header replaces every value of
    /// the same name set by earlier layers, and all of its own values are kept.
    pub fn headers_for(&self, url: &Url, caller: &HeaderMap) -> HeaderMap {
        let mut headers = Self::browser_headers();

        if let Some(cookie) = self.cookie() {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(e) => warn!("Ignoring session cookie with invalid characters: {}", e),
            }
        }

        if url.host_str().is_some_and(is_youtube_host) {
            if let Some(token) = self.po_token() {
                match HeaderValue::from_str(token) {
                    Ok(value) => {
                        headers.insert(HeaderName::from_static(PO_TOKEN_HEADER), value);
                    }
                    Err(e) => warn!("Ignoring origin token with invalid characters: {}", e),
                }
            }
            headers.insert(ORIGIN, HeaderValue::from_static(YOUTUBE_ORIGIN));
            headers.insert(REFERER, HeaderValue::from_static("https://www.youtube.com/"));
        }

        for name in caller.keys() {
            headers.remove(name);
            for value in caller.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        headers
    }

    /// Decorates a built request in place and returns it
    pub fn decorate(&self, mut request: reqwest::Request) -> reqwest::Request {
        let headers = self.headers_for(request.url(), request.headers());
        *request.headers_mut() = headers;
        request
    }
}
