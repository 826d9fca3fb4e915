#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Image view binding for imgbind
//!
//! An [`ImageBinding`] connects a URL to an [`ImageView`]. Assigning a URL
//! cancels whatever the binding was downloading, fetches the new image
//! (or takes it from the [`Simulator`](imgbind_simulator::Simulator) when
//! one is installed and matches), runs the user callbacks and finally sets
//! the image on the view.
//!
//! Results are delivered in two stages. The `*_async` callbacks run where
//! the download finished, typically a tokio worker. The UI callbacks and
//! the view update are handed to the context's [`UiDispatcher`]; use
//! [`main_queue`] when views must only be touched from one thread.

mod binding;
mod context;
mod dispatcher;
mod session;

pub use binding::{ImageBinding, ImageView};
pub use context::DownloadContext;
pub use dispatcher::{main_queue, InlineDispatcher, MainQueue, MainQueueRunner, UiDispatcher, UiJob};
pub use session::{DownloadSession, ErrorCallback, SessionState, SuccessCallback};
