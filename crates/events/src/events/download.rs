use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::FailureContext;

/// Image download lifecycle events, one stream per binding session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// A session started fetching `url`
    Started {
        session_id: u64,
        url: String,
        simulated: bool,
    },

    /// The image reached the view (or was consumed by a callback)
    Completed {
        session_id: u64,
        url: String,
        width: u32,
        height: u32,
        elapsed: Duration,
        displayed: bool,
    },

    /// The attempt failed and the error callbacks ran
    Failed {
        session_id: u64,
        url: String,
        status: Option<u16>,
        failure: FailureContext,
    },

    /// The session was cancelled before it delivered anything
    Cancelled { session_id: u64, url: String },
}

impl DownloadEvent {
    #[must_use]
    pub fn session_id(&self) -> u64 {
        match self {
            Self::Started { session_id, .. }
            | Self::Completed { session_id, .. }
            | Self::Failed { session_id, .. }
            | Self::Cancelled { session_id, .. } => *session_id,
        }
    }
}
