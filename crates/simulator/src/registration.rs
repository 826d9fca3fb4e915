//! A registered URL pattern and the downloads it has caught

use crate::downloader::SimulatedDownloader;
use imgbind_errors::FetchError;
use imgbind_types::{HttpResponse, Image};
use std::sync::{Arc, Mutex, PoisonError};

/// Fixture that resolves matching downloads as soon as they start
#[derive(Debug, Clone)]
pub enum AutoResponse {
    Image(Image),
    /// `error: None` is delivered as [`FetchError::Simulated`]
    Error {
        error: Option<FetchError>,
        response: Option<HttpResponse>,
    },
}

impl AutoResponse {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Error { .. } => "error",
        }
    }
}

/// Intercepts every request whose URL contains `url_part`
///
/// Downloaders are appended in the order their requests were made and stay
/// here until the simulator is cleared.
#[derive(Debug)]
pub struct SimulatorRegistration {
    url_part: String,
    auto_response: Option<AutoResponse>,
    downloaders: Mutex<Vec<Arc<SimulatedDownloader>>>,
}

impl SimulatorRegistration {
    pub(crate) fn new(url_part: String, auto_response: Option<AutoResponse>) -> Self {
        Self {
            url_part,
            auto_response,
            downloaders: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn url_part(&self) -> &str {
        &self.url_part
    }

    #[must_use]
    pub fn auto_response(&self) -> Option<&AutoResponse> {
        self.auto_response.as_ref()
    }

    /// Snapshot of the downloaders matched so far, oldest first
    #[must_use]
    pub fn downloaders(&self) -> Vec<Arc<SimulatedDownloader>> {
        self.downloaders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn downloader_count(&self) -> usize {
        self.downloaders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Send `image` to every matched download
    pub fn respond_with_image(&self, image: &Image) {
        for downloader in self.downloaders() {
            downloader.respond_with_image(image.clone());
        }
    }

    /// Send an error to every matched download
    pub fn respond_with_error(&self, error: Option<FetchError>, response: Option<HttpResponse>) {
        for downloader in self.downloaders() {
            downloader.respond_with_error(error.clone(), response.clone());
        }
    }

    pub(crate) fn attach(&self, downloader: Arc<SimulatedDownloader>) {
        self.downloaders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(downloader);
    }
}
