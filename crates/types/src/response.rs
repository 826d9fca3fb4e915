//! Snapshot of a completed HTTP exchange handed to error callbacks

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status line and headers of an HTTP response
///
/// Header names are stored lower-case; lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            headers: BTreeMap::new(),
        }
    }

    /// Add a header, replacing any previous value for the same name
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    pub fn insert_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// MIME essence of the `Content-Type` header
    ///
    /// Parameters are dropped and the type is lower-cased, so
    /// `Image/PNG; charset=binary` yields `image/png`. An empty header counts
    /// as absent.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        let raw = self.header("content-type")?;
        let essence = raw.split(';').next().unwrap_or_default().trim();
        if essence.is_empty() {
            None
        } else {
            Some(essence.to_ascii_lowercase())
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}
