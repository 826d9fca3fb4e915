#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in imgbind
//!
//! Downloads and the request simulator report what they do as typed events
//! on an unbounded channel. Consumers (a UI status bar, a test) drain the
//! receiver; emitters never block and ignore a dropped receiver.

pub mod events;
pub use events::{AppEvent, DownloadEvent, FailureContext, SimulatorEvent};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender using the `AppEvent` system
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver using the `AppEvent` system
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel with the `AppEvent` system
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events
///
/// Implemented for a raw `EventSender` and for `Option<EventSender>` so
/// components with optional reporting can call it unconditionally.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a download started event
    fn emit_download_started(&self, session_id: u64, url: impl Into<String>, simulated: bool) {
        self.emit(AppEvent::Download(DownloadEvent::Started {
            session_id,
            url: url.into(),
            simulated,
        }));
    }

    /// Emit a download cancelled event
    fn emit_download_cancelled(&self, session_id: u64, url: impl Into<String>) {
        self.emit(AppEvent::Download(DownloadEvent::Cancelled {
            session_id,
            url: url.into(),
        }));
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
