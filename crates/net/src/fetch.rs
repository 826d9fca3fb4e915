//! Fetch an image and turn the HTTP reply into a decoded image

use crate::transport::{HttpReply, HttpTransport, TransportFailure};
use crate::validation::validate_response;
use imgbind_errors::FetchError;
use imgbind_types::{HttpResponse, Image};
use std::fmt;
use url::Url;

/// A failed fetch: the error plus whatever response was received
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub error: FetchError,
    pub response: Option<HttpResponse>,
}

impl FetchFailure {
    #[must_use]
    pub fn new(error: FetchError, response: Option<HttpResponse>) -> Self {
        Self { error, response }
    }

    /// Status code of the attached response, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for FetchFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<TransportFailure> for FetchFailure {
    fn from(failure: TransportFailure) -> Self {
        Self::new(FetchError::Transport(failure.message), failure.response)
    }
}

/// Validate a reply and decode its body
///
/// # Errors
///
/// Returns the validation error from [`validate_response`] or
/// `ImageDecodeFailed`, always with the response attached.
pub fn decode_reply(reply: HttpReply) -> Result<Image, FetchFailure> {
    let HttpReply { response, body } = reply;

    match validate_response(&response).and_then(|encoding| Image::decode(&body, encoding)) {
        Ok(image) => Ok(image),
        Err(error) => Err(FetchFailure::new(error, Some(response))),
    }
}

/// GET `url` through `transport` and decode the image
///
/// # Errors
///
/// Returns `Transport` for network failures, otherwise the errors of
/// [`decode_reply`].
pub async fn fetch_image(transport: &dyn HttpTransport, url: &Url) -> Result<Image, FetchFailure> {
    let reply = transport.get(url).await?;
    tracing::debug!(
        %url,
        status = reply.response.status,
        bytes = reply.body.len(),
        "received image response"
    );
    decode_reply(reply)
}
