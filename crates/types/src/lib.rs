#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for imgbind
//!
//! This crate provides the value types passed between the downloaders,
//! the simulator and the image binding: decoded images, HTTP response
//! snapshots and the request cache policy.

pub mod decoded;
pub mod response;

// Re-export commonly used types
pub use decoded::{DynamicImage, Image, ImageEncoding};
pub use response::HttpResponse;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How the HTTP cache is consulted for image requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Cache according to response headers such as age and expiry
    #[default]
    UseProtocolPolicy,
    /// Always load from the source
    ReloadIgnoringCache,
    /// Use cached data regardless of age, loading only on a miss
    ReturnCacheElseLoad,
    /// Use cached data only; never touch the source
    ReturnCacheOnly,
}

impl std::fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UseProtocolPolicy => write!(f, "use_protocol_policy"),
            Self::ReloadIgnoringCache => write!(f, "reload_ignoring_cache"),
            Self::ReturnCacheElseLoad => write!(f, "return_cache_else_load"),
            Self::ReturnCacheOnly => write!(f, "return_cache_only"),
        }
    }
}

impl FromStr for CachePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "use_protocol_policy" => Ok(Self::UseProtocolPolicy),
            "reload_ignoring_cache" => Ok(Self::ReloadIgnoringCache),
            "return_cache_else_load" => Ok(Self::ReturnCacheElseLoad),
            "return_cache_only" => Ok(Self::ReturnCacheOnly),
            other => Err(other.to_string()),
        }
    }
}
