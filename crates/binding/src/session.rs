//! One download attempt and the pipeline that delivers its result
//!
//! Results travel in two stages. The downloader's handler runs the
//! asynchronous callbacks wherever the download finished; the second stage
//! runs the UI callbacks and updates the view on the UI context. The
//! cancellation flag is checked at the start of each stage, and again when
//! the result is handed over, under a lock that `cancel` also takes.

use crate::binding::ImageView;
use crate::context::DownloadContext;
use crate::dispatcher::{UiDispatcher, UiJob};
use imgbind_errors::FetchError;
use imgbind_events::{AppEvent, DownloadEvent, EventEmitter, EventSender, FailureContext};
use imgbind_net::{ErrorHandler, ImageDownloader, SuccessHandler};
use imgbind_types::{HttpResponse, Image};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::thread::{self, ThreadId};
use std::time::Instant;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Where a download session is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Downloading,
    /// The image reached the UI stage
    Completed,
    /// The error reached the UI stage
    Failed,
    Cancelled,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Downloading => write!(f, "downloading"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Transforms a downloaded image; `None` keeps it off the view
pub type SuccessCallback = Arc<dyn Fn(Image) -> Option<Image> + Send + Sync>;

/// Observes a failed download and the response, if one arrived
pub type ErrorCallback = Arc<dyn Fn(&FetchError, Option<&HttpResponse>) + Send + Sync>;

/// User callbacks of a binding, read when a result arrives
#[derive(Clone, Default)]
pub(crate) struct Callbacks {
    pub on_success: Option<SuccessCallback>,
    pub on_success_async: Option<SuccessCallback>,
    pub on_error: Option<ErrorCallback>,
    pub on_error_async: Option<ErrorCallback>,
}

pub(crate) type SharedCallbacks = Arc<RwLock<Callbacks>>;

/// State shared between a session and its pipeline
struct SessionShared {
    id: u64,
    url: String,
    simulated: bool,
    started: Instant,
    cancelled: AtomicBool,
    state: Mutex<SessionState>,
    /// Held while a result is handed to the view or `on_error`
    delivery: Mutex<()>,
    /// Thread holding `delivery`, so a callback can cancel its own session
    delivering: Mutex<Option<ThreadId>>,
}

impl SessionShared {
    fn new(id: u64, url: String, simulated: bool) -> Self {
        Self {
            id,
            url,
            simulated,
            started: Instant::now(),
            cancelled: AtomicBool::new(false),
            state: Mutex::new(SessionState::Idle),
            delivery: Mutex::new(()),
            delivering: Mutex::new(None),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `to` if allowed, returning the previous state
    ///
    /// `Cancelled` is final. Results may arrive more than once (simulated
    /// downloads), so `Completed` and `Failed` can follow each other.
    fn transition(&self, to: SessionState) -> Option<SessionState> {
        use SessionState::{Cancelled, Completed, Downloading, Failed, Idle};

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let allowed = matches!(
            (*state, to),
            (Idle, Downloading)
                | (Idle | Downloading, Cancelled)
                | (Downloading | Completed | Failed, Completed | Failed)
        );
        if !allowed {
            return None;
        }
        Some(std::mem::replace(&mut *state, to))
    }

    /// Set the cancelled flag, waiting for a delivery in progress
    ///
    /// Once this returns nothing more reaches the view. A callback running
    /// inside a delivery of this session only sets the flag.
    fn mark_cancelled(&self) {
        if *lock(&self.delivering) == Some(thread::current().id()) {
            self.cancelled.store(true, Ordering::SeqCst);
            return;
        }
        let _delivery = lock(&self.delivery);
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Run `deliver` unless the session is cancelled
    fn deliver<R>(&self, deliver: impl FnOnce() -> R) -> Option<R> {
        let _delivery = lock(&self.delivery);
        if self.is_cancelled() {
            return None;
        }
        *lock(&self.delivering) = Some(thread::current().id());
        let result = deliver();
        *lock(&self.delivering) = None;
        Some(result)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single download started by a binding
///
/// Once cancelled, no callback of the session runs and the view is left
/// alone, even if the downloader still produces a result.
pub struct DownloadSession {
    shared: Arc<SessionShared>,
    downloader: Arc<dyn ImageDownloader>,
    dispatcher: Arc<dyn UiDispatcher>,
    events: Option<EventSender>,
}

impl DownloadSession {
    /// Create an idle session, consulting the simulator for `url`
    pub(crate) fn new(context: &DownloadContext, url: String) -> Self {
        let (downloader, simulated) = context.downloader_for(&url);
        Self {
            shared: Arc::new(SessionShared::new(
                NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
                url,
                simulated,
            )),
            downloader,
            dispatcher: Arc::clone(context.dispatcher()),
            events: context.event_sender().cloned(),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.shared.url
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Whether the simulator intercepted this download
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.shared.simulated
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Start the download, unless the session was cancelled first
    pub(crate) fn begin(&self, callbacks: SharedCallbacks, view: Option<Weak<dyn ImageView>>) {
        if self.shared.transition(SessionState::Downloading).is_none() {
            tracing::debug!(session = self.id(), "session cancelled before start");
            return;
        }

        tracing::debug!(
            session = self.id(),
            url = %self.shared.url,
            simulated = self.shared.simulated,
            "starting image download"
        );
        self.events
            .emit_download_started(self.id(), self.url(), self.is_simulated());

        let pipeline = Pipeline {
            session: Arc::clone(&self.shared),
            callbacks,
            view,
            dispatcher: Arc::clone(&self.dispatcher),
            events: self.events.clone(),
        };

        let success = pipeline.clone();
        let on_success: SuccessHandler = Arc::new(move |image: Image| success.image_received(image));
        let on_error: ErrorHandler =
            Arc::new(move |error: FetchError, response: Option<HttpResponse>| {
                pipeline.error_received(error, response);
            });

        if self.is_cancelled() {
            return;
        }
        self.downloader
            .start_download(&self.shared.url, on_success, on_error);
    }

    /// Stop the download and suppress every later callback
    ///
    /// Idempotent. Waits for a view update or `on_error` call of this
    /// session running on another thread.
    pub fn cancel(&self) {
        self.shared.mark_cancelled();
        self.downloader.cancel();

        if self.shared.transition(SessionState::Cancelled) == Some(SessionState::Downloading) {
            tracing::debug!(session = self.id(), url = %self.shared.url, "image download cancelled");
            self.events.emit_download_cancelled(self.id(), self.url());
        }
    }
}

impl fmt::Debug for DownloadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadSession")
            .field("id", &self.shared.id)
            .field("url", &self.shared.url)
            .field("simulated", &self.shared.simulated)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Carries a result from the downloader to the user callbacks and the view
#[derive(Clone)]
struct Pipeline {
    session: Arc<SessionShared>,
    callbacks: SharedCallbacks,
    view: Option<Weak<dyn ImageView>>,
    dispatcher: Arc<dyn UiDispatcher>,
    events: Option<EventSender>,
}

impl Pipeline {
    fn callbacks(&self) -> Callbacks {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Simulated results stay on the responding thread
    fn on_ui(&self, job: UiJob) {
        if self.session.simulated {
            job();
        } else {
            self.dispatcher.dispatch(job);
        }
    }

    fn image_received(&self, image: Image) {
        if self.session.is_cancelled() {
            tracing::trace!(session = self.session.id, "dropping image for cancelled session");
            return;
        }

        let size = (image.width(), image.height());
        let image = match self.callbacks().on_success_async {
            Some(transform) => transform(image),
            None => Some(image),
        };

        let stage = self.clone();
        self.on_ui(Box::new(move || stage.show_image(image, size)));
    }

    fn show_image(&self, image: Option<Image>, (width, height): (u32, u32)) {
        if self.session.is_cancelled() {
            tracing::trace!(session = self.session.id, "dropping image for cancelled session");
            return;
        }

        let image = match (image, self.callbacks().on_success) {
            (Some(image), Some(transform)) => transform(image),
            (image, _) => image,
        };

        // on_success may have run while the session was replaced
        let delivered = self.session.deliver(|| {
            let view = self.view.as_ref().and_then(Weak::upgrade);
            let displayed = match (image, view) {
                (Some(image), Some(view)) => {
                    view.set_image(image);
                    true
                }
                _ => false,
            };
            self.session.transition(SessionState::Completed);
            displayed
        });
        let Some(displayed) = delivered else {
            tracing::trace!(session = self.session.id, "dropping image for cancelled session");
            return;
        };

        let elapsed = self.session.started.elapsed();
        tracing::debug!(
            session = self.session.id,
            url = %self.session.url,
            width,
            height,
            displayed,
            ?elapsed,
            "image download completed"
        );
        self.events.emit(AppEvent::Download(DownloadEvent::Completed {
            session_id: self.session.id,
            url: self.session.url.clone(),
            width,
            height,
            elapsed,
            displayed,
        }));
    }

    fn error_received(&self, error: FetchError, response: Option<HttpResponse>) {
        if self.session.is_cancelled() {
            tracing::trace!(session = self.session.id, "dropping error for cancelled session");
            return;
        }

        if let Some(callback) = self.callbacks().on_error_async {
            callback(&error, response.as_ref());
        }

        let stage = self.clone();
        self.on_ui(Box::new(move || stage.report_error(&error, response.as_ref())));
    }

    fn report_error(&self, error: &FetchError, response: Option<&HttpResponse>) {
        if self.session.is_cancelled() {
            tracing::trace!(session = self.session.id, "dropping error for cancelled session");
            return;
        }

        let callback = self.callbacks().on_error;
        let delivered = self.session.deliver(|| {
            self.session.transition(SessionState::Failed);
            if let Some(callback) = callback {
                callback(error, response);
            }
        });
        if delivered.is_none() {
            tracing::trace!(session = self.session.id, "dropping error for cancelled session");
            return;
        }

        let status = response.map(|r| r.status);
        tracing::debug!(
            session = self.session.id,
            url = %self.session.url,
            %error,
            ?status,
            "image download failed"
        );
        self.events.emit(AppEvent::Download(DownloadEvent::Failed {
            session_id: self.session.id,
            url: self.session.url.clone(),
            status,
            failure: FailureContext::from_error(error),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(state: SessionState) -> SessionShared {
        let session = SessionShared::new(1, "http://site.com/a.png".to_string(), false);
        *lock(&session.state) = state;
        session
    }

    #[test]
    fn test_transitions() {
        let session = shared(SessionState::Idle);
        assert_eq!(session.transition(SessionState::Completed), None);
        assert_eq!(
            session.transition(SessionState::Downloading),
            Some(SessionState::Idle)
        );
        assert_eq!(
            session.transition(SessionState::Completed),
            Some(SessionState::Downloading)
        );
        assert_eq!(
            session.transition(SessionState::Failed),
            Some(SessionState::Completed)
        );
        // Too late to cancel a finished session
        assert_eq!(session.transition(SessionState::Cancelled), None);
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_cancelled_is_final() {
        let session = shared(SessionState::Downloading);
        assert_eq!(
            session.transition(SessionState::Cancelled),
            Some(SessionState::Downloading)
        );
        assert_eq!(session.transition(SessionState::Cancelled), None);
        assert_eq!(session.transition(SessionState::Completed), None);
        assert_eq!(session.transition(SessionState::Downloading), None);
        assert_eq!(session.state(), SessionState::Cancelled);
    }

    #[test]
    fn test_deliver_skipped_after_cancel() {
        let session = shared(SessionState::Downloading);
        assert_eq!(session.deliver(|| 1), Some(1));
        session.mark_cancelled();
        assert_eq!(session.deliver(|| 2), None);
    }

    #[test]
    fn test_cancel_from_inside_delivery() {
        let session = shared(SessionState::Downloading);
        let delivered = session.deliver(|| {
            session.mark_cancelled();
            session.is_cancelled()
        });
        assert_eq!(delivered, Some(true));
        assert_eq!(session.deliver(|| ()), None);
    }

    #[test]
    fn test_cancel_waits_for_delivery_on_other_thread() {
        let session = Arc::new(shared(SessionState::Downloading));
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let worker = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                session.deliver(|| {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
            })
        };
        entered_rx.recv().unwrap();

        let canceller = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || session.mark_cancelled())
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        // Still blocked behind the delivery
        assert!(!session.is_cancelled());

        release_tx.send(()).unwrap();
        assert_eq!(worker.join().unwrap(), Some(()));
        canceller.join().unwrap();
        assert!(session.is_cancelled());
    }
}
