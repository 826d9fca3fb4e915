//! Everything a binding needs to run downloads

use crate::dispatcher::UiDispatcher;
use imgbind_config::Config;
use imgbind_errors::Error;
use imgbind_events::{EventEmitter, EventSender};
use imgbind_net::{HttpImageDownloader, HttpTransport, ImageDownloader, NetConfig, SharedClient};
use imgbind_simulator::Simulator;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Transport, runtime, UI dispatcher and optional simulator shared by
/// bindings
///
/// Cheap to clone; bindings created from clones share the same transport.
#[derive(Clone)]
pub struct DownloadContext {
    transport: Arc<dyn HttpTransport>,
    runtime: Handle,
    dispatcher: Arc<dyn UiDispatcher>,
    simulator: Option<Simulator>,
    events: Option<EventSender>,
}

impl DownloadContext {
    /// Create a context on the current tokio runtime
    ///
    /// # Errors
    ///
    /// Returns an internal error when called outside a tokio runtime.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        dispatcher: Arc<dyn UiDispatcher>,
    ) -> Result<Self, Error> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::internal(format!("no tokio runtime for downloads: {e}")))?;
        Ok(Self::with_runtime(transport, dispatcher, runtime))
    }

    /// Create a context that spawns downloads on `runtime`
    #[must_use]
    pub fn with_runtime(
        transport: Arc<dyn HttpTransport>,
        dispatcher: Arc<dyn UiDispatcher>,
        runtime: Handle,
    ) -> Self {
        Self {
            transport,
            runtime,
            dispatcher,
            simulator: None,
            events: None,
        }
    }

    /// Create a context backed by a [`SharedClient`] built from `config`
    ///
    /// # Errors
    ///
    /// Returns an internal error when called outside a tokio runtime.
    pub fn from_config(config: &Config, dispatcher: Arc<dyn UiDispatcher>) -> Result<Self, Error> {
        let client = SharedClient::new(NetConfig::from_config(config));
        Self::new(Arc::new(client), dispatcher)
    }

    /// Route matching requests to `simulator` instead of the transport
    #[must_use]
    pub fn with_simulator(mut self, simulator: Simulator) -> Self {
        self.simulator = Some(simulator);
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    #[must_use]
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<dyn UiDispatcher> {
        &self.dispatcher
    }

    #[must_use]
    pub fn simulator(&self) -> Option<&Simulator> {
        self.simulator.as_ref()
    }

    /// Pick the downloader for `url`
    ///
    /// The flag is `true` when the simulator intercepted the request.
    pub(crate) fn downloader_for(&self, url: &str) -> (Arc<dyn ImageDownloader>, bool) {
        if let Some(downloader) = self
            .simulator
            .as_ref()
            .and_then(|simulator| simulator.create_downloader(url))
        {
            let downloader: Arc<dyn ImageDownloader> = downloader;
            return (downloader, true);
        }

        let downloader: Arc<dyn ImageDownloader> = Arc::new(HttpImageDownloader::new(
            Arc::clone(&self.transport),
            self.runtime.clone(),
        ));
        (downloader, false)
    }
}

impl EventEmitter for DownloadContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}
