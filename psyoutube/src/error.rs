//! Error types for stream resolution and search

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Result type alias for YouTube operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or searching
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Search called with an empty query
    #[error("Missing query")]
    QueryMissing,

    /// A required request parameter is missing or empty
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Neither audio-only nor muxed streams are available
    #[error("YouTube returned 0 playable streams for ID: {0}")]
    NoStreams(String),

    /// The extraction provider failed (network, parse, content blocked)
    #[error("{class}: {message}")]
    Extraction { class: String, message: String },

    /// The search provider failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Missing or unusable configuration (API key, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration store error (from psconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl Error {
    pub fn extraction(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            class: class.into(),
            message: message.into(),
        }
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Short name of the failure kind, used as the `class` of extraction errors
    pub fn class_name(&self) -> &str {
        match self {
            Error::QueryMissing | Error::MissingParameter(_) => "ValidationError",
            Error::NoStreams(_) => "NoStreamsError",
            Error::Extraction { class, .. } => class,
            Error::Upstream(_) => "UpstreamError",
            Error::Configuration(_) | Error::Config(_) => "ConfigurationError",
            Error::Http(e) if e.is_timeout() => "TimeoutError",
            Error::Http(_) => "HttpError",
            Error::Json(_) => "ParsingError",
            Error::InvalidUrl(_) => "InvalidUrlError",
        }
    }

    /// Wraps provider-level failures into [`Error::Extraction`]
    ///
    /// Validation, `NoStreams` and already wrapped errors are returned as is.
    pub fn into_extraction(self) -> Self {
        match self {
            Error::QueryMissing
            | Error::MissingParameter(_)
            | Error::NoStreams(_)
            | Error::Extraction { .. } => self,
            other => Error::Extraction {
                class: other.class_name().to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Error::QueryMissing => "QUERY_MISSING",
            Error::MissingParameter(_) => "VALIDATION_ERROR",
            Error::NoStreams(_) => "NO_STREAMS",
            Error::Extraction { .. } => "EXTRACTION_EXCEPTION",
            Error::Configuration(_) | Error::Config(_) => "CONFIGURATION_ERROR",
            Error::Upstream(_) | Error::Http(_) | Error::Json(_) | Error::InvalidUrl(_) => {
                "UPSTREAM_ERROR"
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::QueryMissing | Error::MissingParameter(_) => StatusCode::BAD_REQUEST,
            Error::NoStreams(_) => StatusCode::NOT_FOUND,
            Error::Extraction { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.status() == StatusCode::BAD_REQUEST
    }
}

/// Structured error body `{code, message}`
#[derive(Debug, Clone, Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_status() {
        let err = Error::NoStreams("abc".to_string());
        assert_eq!(err.code(), "NO_STREAMS");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "YouTube returned 0 playable streams for ID: abc");

        assert_eq!(Error::QueryMissing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::MissingParameter("id").code(), "VALIDATION_ERROR");
        assert!(Error::QueryMissing.is_validation());
    }

    #[test]
    fn test_into_extraction_wraps_provider_failures() {
        let err = Error::upstream("connection reset").into_extraction();
        match &err {
            Error::Extraction { class, message } => {
                assert_eq!(class, "UpstreamError");
                assert_eq!(message, "Upstream error: connection reset");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.code(), "EXTRACTION_EXCEPTION");
        assert_eq!(err.to_string(), "UpstreamError: Upstream error: connection reset");

        let kept = Error::NoStreams("x".into()).into_extraction();
        assert!(matches!(kept, Error::NoStreams(_)));
    }

    #[test]
    fn test_error_body() {
        let body = ErrorBody::from(&Error::extraction("LoginRequired", "Sign in to confirm"));
        assert_eq!(body.code, "EXTRACTION_EXCEPTION");
        assert_eq!(body.message, "LoginRequired: Sign in to confirm");
    }
}
