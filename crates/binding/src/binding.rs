//! Binding between a URL and the view that shows the downloaded image

use crate::context::DownloadContext;
use crate::session::{Callbacks, DownloadSession, SessionState, SharedCallbacks};
use imgbind_errors::FetchError;
use imgbind_types::{HttpResponse, Image};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLockWriteGuard, Weak};

/// Something that can display an image
///
/// `set_image` is only called from the UI stage of a download, that is
/// through the context's dispatcher or, for simulated downloads, on the
/// thread that responded.
pub trait ImageView: Send + Sync {
    fn set_image(&self, image: Image);
}

/// Downloads images for one view
///
/// Assigning a URL cancels the previous download and starts a new one. When
/// the image arrives it passes through the success callbacks and ends up
/// on the view. The binding only holds a weak reference to the view, so an
/// owner can keep the binding as a field of the view itself.
///
/// Dropping the binding cancels its download.
pub struct ImageBinding {
    context: DownloadContext,
    view: Option<Weak<dyn ImageView>>,
    callbacks: SharedCallbacks,
    session: Mutex<Option<Arc<DownloadSession>>>,
    url: Mutex<Option<String>>,
}

impl ImageBinding {
    /// Bind downloads to `view`
    #[must_use]
    pub fn new<V: ImageView + 'static>(context: DownloadContext, view: &Arc<V>) -> Self {
        let view: Weak<V> = Arc::downgrade(view);
        let view: Weak<dyn ImageView> = view;
        Self::with_view(context, Some(view))
    }

    /// A binding without a view
    ///
    /// Images are only seen by the success callbacks.
    #[must_use]
    pub fn detached(context: DownloadContext) -> Self {
        Self::with_view(context, None)
    }

    fn with_view(context: DownloadContext, view: Option<Weak<dyn ImageView>>) -> Self {
        Self {
            context,
            view,
            callbacks: Arc::default(),
            session: Mutex::new(None),
            url: Mutex::new(None),
        }
    }

    /// Download `url` and show it in the view
    ///
    /// Any download in progress is cancelled first. An invalid URL is
    /// reported to `on_error_async` before this returns; the other callbacks
    /// follow through the usual stages.
    pub fn set_url(&self, url: impl Into<String>) {
        let url = url.into();
        *lock(&self.url) = Some(url.clone());

        let session = {
            let mut current = lock(&self.session);
            if let Some(previous) = current.take() {
                previous.cancel();
            }
            let session = Arc::new(DownloadSession::new(&self.context, url));
            *current = Some(Arc::clone(&session));
            session
        };

        // Simulated downloads may call back into the binding before this
        // returns, so the session lock is not held here.
        session.begin(Arc::clone(&self.callbacks), self.view.clone());
    }

    /// Cancel the download and forget the URL
    pub fn clear_url(&self) {
        if let Some(session) = lock(&self.session).take() {
            session.cancel();
        }
        *lock(&self.url) = None;
    }

    /// The URL last assigned, if any
    #[must_use]
    pub fn url(&self) -> Option<String> {
        lock(&self.url).clone()
    }

    /// Cancel the current download
    ///
    /// No callback runs for it afterwards and the view keeps its image. The
    /// URL is kept; assign it again to restart.
    pub fn cancel(&self) {
        if let Some(session) = lock(&self.session).as_ref() {
            session.cancel();
        }
    }

    /// State of the current download, `Idle` when there is none
    #[must_use]
    pub fn state(&self) -> SessionState {
        lock(&self.session)
            .as_ref()
            .map_or(SessionState::Idle, |session| session.state())
    }

    /// The current download session
    #[must_use]
    pub fn session(&self) -> Option<Arc<DownloadSession>> {
        lock(&self.session).clone()
    }

    #[must_use]
    pub fn context(&self) -> &DownloadContext {
        &self.context
    }

    /// Called on the UI context before the image is shown
    ///
    /// Return the image to show, possibly modified, or `None` to leave the
    /// view unchanged.
    pub fn on_success<F>(&self, callback: F)
    where
        F: Fn(Image) -> Option<Image> + Send + Sync + 'static,
    {
        self.callbacks_mut().on_success = Some(Arc::new(callback));
    }

    /// Called off the UI context as soon as the image is decoded
    ///
    /// The place for expensive processing. Returning `None` skips
    /// `on_success` and leaves the view unchanged.
    pub fn on_success_async<F>(&self, callback: F)
    where
        F: Fn(Image) -> Option<Image> + Send + Sync + 'static,
    {
        self.callbacks_mut().on_success_async = Some(Arc::new(callback));
    }

    /// Called on the UI context when the download fails
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(&FetchError, Option<&HttpResponse>) + Send + Sync + 'static,
    {
        self.callbacks_mut().on_error = Some(Arc::new(callback));
    }

    /// Called off the UI context when the download fails, before `on_error`
    pub fn on_error_async<F>(&self, callback: F)
    where
        F: Fn(&FetchError, Option<&HttpResponse>) + Send + Sync + 'static,
    {
        self.callbacks_mut().on_error_async = Some(Arc::new(callback));
    }

    fn callbacks_mut(&self) -> RwLockWriteGuard<'_, Callbacks> {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ImageBinding {
    fn drop(&mut self) {
        if let Some(session) = lock(&self.session).take() {
            session.cancel();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
