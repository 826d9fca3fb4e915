//! Image fetch error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Reasons a single image download attempt can fail.
///
/// Every variant is scoped to one attempt; nothing here is fatal to the
/// process and nothing is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP status {status} is not 200")]
    HttpStatusNotOk { status: u16 },

    #[error("response is missing the Content-Type header")]
    MissingContentType,

    #[error("unsupported content type: {content_type}")]
    UnsupportedContentType { content_type: String },

    #[error("failed to decode image data: {0}")]
    ImageDecodeFailed(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("simulated error")]
    Simulated,
}

impl FetchError {
    /// Stable numeric code, negative like the rest of the taxonomy.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidUrl(_) => -1,
            Self::HttpStatusNotOk { .. } => -2,
            Self::MissingContentType => -3,
            Self::UnsupportedContentType { .. } => -4,
            Self::ImageDecodeFailed(_) => -5,
            Self::Transport(_) => -6,
            Self::Simulated => -7,
        }
    }
}

impl UserFacingError for FetchError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidUrl(_) => Some("Use an absolute http:// or https:// URL."),
            Self::HttpStatusNotOk { .. } => {
                Some("Check that the image exists on the server and is publicly readable.")
            }
            Self::MissingContentType | Self::UnsupportedContentType { .. } => {
                Some("Serve the image as image/png or image/jpeg.")
            }
            Self::Transport(_) => Some("Check your network connection and retry."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::HttpStatusNotOk { status } => *status >= 500,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidUrl(_) => "fetch.invalid_url",
            Self::HttpStatusNotOk { .. } => "fetch.http_status_not_ok",
            Self::MissingContentType => "fetch.missing_content_type",
            Self::UnsupportedContentType { .. } => "fetch.unsupported_content_type",
            Self::ImageDecodeFailed(_) => "fetch.image_decode_failed",
            Self::Transport(_) => "fetch.transport",
            Self::Simulated => "fetch.simulated",
        };
        Some(code)
    }
}
