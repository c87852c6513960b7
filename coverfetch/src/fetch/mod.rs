//! Remote image source.
//!
//! The [`ImageFetcher`] trait hides the transport so tasks can be exercised
//! against in-process fakes. [`ReqwestFetcher`] is the HTTP(S) implementation
//! used in production.

mod error;
mod http;

pub use error::FetchError;
pub use http::{ImageFetcher, ReqwestFetcher, DEFAULT_CONNECT_TIMEOUT_SECS};

#[cfg(test)]
pub(crate) use http::tests::MockImageFetcher;
