use serde::{Deserialize, Serialize};

/// Events from the request simulator used in tests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimulatorEvent {
    /// A URL pattern was registered
    Registered {
        url_part: String,
        auto_response: Option<String>, // "image" or "error"
    },

    /// A request was intercepted by one or more registrations
    Matched { url: String, registrations: usize },

    /// All registrations were dropped
    Cleared { registrations: usize },
}
