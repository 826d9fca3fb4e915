//! Hand-off of UI work to the thread that owns the views

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A unit of UI work
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs on the UI context
///
/// Download results are applied to views and passed to the UI-side
/// callbacks only through a dispatcher.
pub trait UiDispatcher: Send + Sync {
    fn dispatch(&self, job: UiJob);
}

/// Runs every job immediately on the calling thread
///
/// For views that can be touched from any thread, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn dispatch(&self, job: UiJob) {
        job();
    }
}

/// Queue of UI jobs drained by the UI owner through a [`MainQueueRunner`]
#[derive(Debug, Clone)]
pub struct MainQueue {
    tx: UnboundedSender<UiJob>,
}

/// Receiving end of a [`MainQueue`]
#[derive(Debug)]
pub struct MainQueueRunner {
    rx: UnboundedReceiver<UiJob>,
}

/// Create a main queue and its runner
#[must_use]
pub fn main_queue() -> (MainQueue, MainQueueRunner) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MainQueue { tx }, MainQueueRunner { rx })
}

impl UiDispatcher for MainQueue {
    fn dispatch(&self, job: UiJob) {
        if self.tx.send(job).is_err() {
            tracing::warn!("main queue runner dropped, discarding UI job");
        }
    }
}

impl MainQueueRunner {
    /// Run the jobs queued so far without waiting, returning how many ran
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Wait for the next job and run it
    ///
    /// Returns `false` once every [`MainQueue`] handle is gone and the queue
    /// is empty.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run jobs until every [`MainQueue`] handle is dropped
    pub async fn run(&mut self) {
        while self.run_next().await {}
    }
}
