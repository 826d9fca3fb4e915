//! Downloader handed out for simulated requests

use crate::registration::AutoResponse;
use imgbind_errors::FetchError;
use imgbind_net::{ErrorHandler, ImageDownloader, SuccessHandler};
use imgbind_types::{HttpResponse, Image};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Stands in for a network download of one matched URL
///
/// Nothing happens until a test responds, either through the
/// registration that matched it or directly on the downloader. Responses
/// run the handlers on the calling thread. A downloader can be responded
/// to more than once; every response reaches the handlers until it is
/// cancelled.
pub struct SimulatedDownloader {
    url: String,
    auto_response: Option<AutoResponse>,
    cancelled: AtomicBool,
    handlers: Mutex<Option<(SuccessHandler, ErrorHandler)>>,
}

impl SimulatedDownloader {
    pub(crate) fn new(url: impl Into<String>, auto_response: Option<AutoResponse>) -> Self {
        Self {
            url: url.into(),
            auto_response,
            cancelled: AtomicBool::new(false),
            handlers: Mutex::new(None),
        }
    }

    /// The request URL this downloader was created for
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fixture applied when the download starts, if any
    #[must_use]
    pub fn auto_response(&self) -> Option<&AutoResponse> {
        self.auto_response.as_ref()
    }

    /// Whether `start_download` has installed handlers
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Deliver `image` to the success handler
    pub fn respond_with_image(&self, image: Image) {
        if let Some((on_success, _)) = self.live_handlers() {
            tracing::debug!(url = %self.url, "simulated image response");
            on_success(image);
        }
    }

    /// Deliver an error to the error handler
    ///
    /// `None` is reported as [`FetchError::Simulated`].
    pub fn respond_with_error(&self, error: Option<FetchError>, response: Option<HttpResponse>) {
        if let Some((_, on_error)) = self.live_handlers() {
            let error = error.unwrap_or(FetchError::Simulated);
            tracing::debug!(url = %self.url, %error, "simulated error response");
            on_error(error, response);
        }
    }

    /// Handlers to call, or `None` when not started or cancelled
    ///
    /// The lock is released before the handlers run so a handler may start
    /// another download.
    fn live_handlers(&self) -> Option<(SuccessHandler, ErrorHandler)> {
        if self.is_cancelled() {
            tracing::trace!(url = %self.url, "ignoring response for cancelled download");
            return None;
        }
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ImageDownloader for SimulatedDownloader {
    fn start_download(&self, _url: &str, on_success: SuccessHandler, on_error: ErrorHandler) {
        *self.handlers.lock().unwrap_or_else(PoisonError::into_inner) = Some((on_success, on_error));

        match &self.auto_response {
            Some(AutoResponse::Image(image)) => self.respond_with_image(image.clone()),
            Some(AutoResponse::Error { error, response }) => {
                self.respond_with_error(error.clone(), response.clone());
            }
            None => {}
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for SimulatedDownloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedDownloader")
            .field("url", &self.url)
            .field("auto_response", &self.auto_response)
            .field("cancelled", &self.is_cancelled())
            .field("started", &self.is_started())
            .finish()
    }
}
