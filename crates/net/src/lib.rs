#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for imgbind
//!
//! This crate fetches images over HTTP: it issues the GET through a
//! pluggable transport, validates status and content type, decodes the
//! body, and wraps all of that in a cancellable downloader.

mod client;
mod downloader;
mod fetch;
mod shared;
mod transport;
mod validation;

pub use client::{cache_control_directive, NetClient, NetConfig};
pub use downloader::{ErrorHandler, HttpImageDownloader, ImageDownloader, SuccessHandler};
pub use fetch::{decode_reply, fetch_image, FetchFailure};
pub use shared::SharedClient;
pub use transport::{HttpReply, HttpTransport, TransportFailure};
pub use validation::{parse_url, validate_response};
