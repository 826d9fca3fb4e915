#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Request simulator for imgbind
//!
//! Tests register URL patterns on a [`Simulator`] and hand it to the
//! download context. Requests whose URL contains a registered pattern get a
//! [`SimulatedDownloader`] instead of touching the network; the test then
//! responds with an image or an error, or registers a fixture that responds
//! automatically.
//!
//! ```
//! use imgbind_simulator::Simulator;
//!
//! let simulator = Simulator::new();
//! let registration = simulator.simulate("35px.jpg");
//!
//! let downloader = simulator.create_downloader("http://site.com/35px.jpg");
//! assert!(downloader.is_some());
//! assert_eq!(registration.downloader_count(), 1);
//! assert!(simulator.create_downloader("http://site.com/other.jpg").is_none());
//! ```

mod downloader;
mod matching;
mod registration;

pub use downloader::SimulatedDownloader;
pub use matching::MatchOptions;
pub use registration::{AutoResponse, SimulatorRegistration};

use imgbind_errors::FetchError;
use imgbind_events::{AppEvent, EventEmitter, EventSender, SimulatorEvent};
use imgbind_types::{HttpResponse, Image};
use std::sync::{Arc, Mutex, PoisonError};

/// Registry of simulated URL patterns
///
/// Clones share the same registrations, so a test can keep one handle and
/// pass another to the code under test.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    registrations: Arc<Mutex<Vec<Arc<SimulatorRegistration>>>>,
    options: MatchOptions,
    events: Option<EventSender>,
}

impl Simulator {
    /// Empty registry with exact matching
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn options(&self) -> MatchOptions {
        self.options
    }

    /// Catch requests containing `url_part`
    ///
    /// The returned registration records each matched downloader and is
    /// used to respond to them.
    pub fn simulate(&self, url_part: impl Into<String>) -> Arc<SimulatorRegistration> {
        self.register(url_part.into(), None)
    }

    /// Catch requests containing `url_part` and answer them with `image`
    pub fn autorespond_with_image(
        &self,
        url_part: impl Into<String>,
        image: Image,
    ) -> Arc<SimulatorRegistration> {
        self.register(url_part.into(), Some(AutoResponse::Image(image)))
    }

    /// Catch requests containing `url_part` and fail them
    ///
    /// Without an explicit error the downloads fail with
    /// [`FetchError::Simulated`].
    pub fn autorespond_with_error(
        &self,
        url_part: impl Into<String>,
        error: Option<FetchError>,
        response: Option<HttpResponse>,
    ) -> Arc<SimulatorRegistration> {
        self.register(
            url_part.into(),
            Some(AutoResponse::Error { error, response }),
        )
    }

    /// Drop every registration; later requests go to the network
    pub fn clear(&self) {
        let removed = {
            let mut registrations = self.lock();
            let removed = registrations.len();
            registrations.clear();
            removed
        };

        tracing::debug!(registrations = removed, "simulator cleared");
        self.emit(AppEvent::Simulator(SimulatorEvent::Cleared {
            registrations: removed,
        }));
    }

    /// Snapshot of all registrations, in registration order
    #[must_use]
    pub fn registrations(&self) -> Vec<Arc<SimulatorRegistration>> {
        self.lock().clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Registrations whose URL part is contained in `url`, in registration order
    #[must_use]
    pub fn matching(&self, url: &str) -> Vec<Arc<SimulatorRegistration>> {
        self.lock()
            .iter()
            .filter(|registration| self.options.contains(url, registration.url_part()))
            .cloned()
            .collect()
    }

    /// Create a downloader for `url` if any registration matches
    ///
    /// The one downloader is recorded on every matching registration. If
    /// several of them carry fixtures, the first image fixture wins over any
    /// error fixture.
    #[must_use]
    pub fn create_downloader(&self, url: &str) -> Option<Arc<SimulatedDownloader>> {
        let matching = self.matching(url);
        if matching.is_empty() {
            return None;
        }

        let auto_response = matching
            .iter()
            .filter_map(|registration| registration.auto_response())
            .find(|response| matches!(response, AutoResponse::Image(_)))
            .or_else(|| {
                matching
                    .iter()
                    .find_map(|registration| registration.auto_response())
            })
            .cloned();

        let downloader = Arc::new(SimulatedDownloader::new(url, auto_response));
        for registration in &matching {
            registration.attach(Arc::clone(&downloader));
        }

        tracing::debug!(url, registrations = matching.len(), "simulated request");
        self.emit(AppEvent::Simulator(SimulatorEvent::Matched {
            url: url.to_string(),
            registrations: matching.len(),
        }));

        Some(downloader)
    }

    fn register(
        &self,
        url_part: String,
        auto_response: Option<AutoResponse>,
    ) -> Arc<SimulatorRegistration> {
        let kind = auto_response.as_ref().map(AutoResponse::kind);
        tracing::debug!(url_part = %url_part, auto_response = ?kind, "registered simulated URL");
        self.emit(AppEvent::Simulator(SimulatorEvent::Registered {
            url_part: url_part.clone(),
            auto_response: kind.map(str::to_string),
        }));

        let registration = Arc::new(SimulatorRegistration::new(url_part, auto_response));
        self.lock().push(Arc::clone(&registration));
        registration
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<SimulatorRegistration>>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventEmitter for Simulator {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}
