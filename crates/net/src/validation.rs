//! URL validation and HTTP response validation for image downloads

use imgbind_errors::FetchError;
use imgbind_types::{HttpResponse, ImageEncoding};
use url::Url;

/// Parse and validate an image URL
///
/// Only absolute `http` and `https` URLs are accepted.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] if the string is not an absolute URL
/// or uses another scheme.
pub fn parse_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(FetchError::InvalidUrl(format!(
            "{url}: unsupported scheme {scheme}"
        ))),
    }
}

/// Check status and content type of an image response
///
/// Returns the encoding the body should be decoded with.
///
/// # Errors
///
/// Returns `HttpStatusNotOk` for any status other than 200,
/// `MissingContentType` when the header is absent and
/// `UnsupportedContentType` when it is not a PNG or JPEG type.
pub fn validate_response(response: &HttpResponse) -> Result<ImageEncoding, FetchError> {
    if !response.is_ok() {
        return Err(FetchError::HttpStatusNotOk {
            status: response.status,
        });
    }

    let content_type = response
        .content_type()
        .ok_or(FetchError::MissingContentType)?;

    ImageEncoding::from_mime(&content_type)
        .ok_or(FetchError::UnsupportedContentType { content_type })
}
