//! Fetch layer
//!
//! This module contains:
//! - The [`Transport`] seam and its reqwest implementation
//! - The [`RetryingRequester`], which wraps a transport with jitter, header
//!   rotation and linear backoff

mod requester;
mod transport;

pub use requester::{FetchOptions, RetryingRequester};
pub use transport::{
    build_http_client, common_headers, Headers, RawResponse, ReqwestTransport, Transport,
};
