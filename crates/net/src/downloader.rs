//! Image downloader abstraction and the HTTP-backed implementation

use crate::fetch::fetch_image;
use crate::transport::HttpTransport;
use crate::validation::parse_url;
use imgbind_errors::FetchError;
use imgbind_types::{HttpResponse, Image};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Receives the decoded image
pub type SuccessHandler = Arc<dyn Fn(Image) + Send + Sync>;

/// Receives the error and the response, if one arrived
pub type ErrorHandler = Arc<dyn Fn(FetchError, Option<HttpResponse>) + Send + Sync>;

/// Downloads one image and reports the outcome through the handlers
///
/// Handlers may run on any thread, and may run before `start_download`
/// returns (invalid URLs, simulated fixtures).
pub trait ImageDownloader: Send + Sync {
    fn start_download(&self, url: &str, on_success: SuccessHandler, on_error: ErrorHandler);

    /// Stop the download. Safe to call at any time, any number of times.
    fn cancel(&self);

    fn is_cancelled(&self) -> bool;
}

/// Downloads over the injected [`HttpTransport`] on a tokio runtime
///
/// Cancellation is final: no handler runs for the fetch in flight and a
/// later `start_download` does nothing. Dropping the downloader cancels it.
pub struct HttpImageDownloader {
    transport: Arc<dyn HttpTransport>,
    runtime: Handle,
    cancelled: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HttpImageDownloader {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, runtime: Handle) -> Self {
        Self {
            transport,
            runtime,
            cancelled: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }
}

impl ImageDownloader for HttpImageDownloader {
    fn start_download(&self, url: &str, on_success: SuccessHandler, on_error: ErrorHandler) {
        if self.is_cancelled() {
            tracing::debug!(url, "downloader already cancelled, not starting");
            return;
        }

        let url = match parse_url(url) {
            Ok(url) => url,
            Err(error) => {
                tracing::debug!(%error, "rejected image URL");
                on_error(error, None);
                return;
            }
        };

        // cancel() sets the flag before taking this lock
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_cancelled() {
            return;
        }

        let transport = Arc::clone(&self.transport);
        let cancelled = Arc::clone(&self.cancelled);
        let task = self.runtime.spawn(async move {
            let result = fetch_image(transport.as_ref(), &url).await;

            if cancelled.load(Ordering::SeqCst) {
                tracing::debug!(%url, "download finished after cancel, dropping result");
                return;
            }

            match result {
                Ok(image) => on_success(image),
                Err(failure) => {
                    tracing::debug!(%url, error = %failure.error, "image download failed");
                    on_error(failure.error, failure.response);
                }
            }
        });

        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for HttpImageDownloader {
    fn drop(&mut self) {
        self.cancel();
    }
}
