//! # df-fetch
//!
//! Network reads for talk resources. [`Fetcher`] layers the resource cache,
//! the origin's disguised not-found probe and transactional batch downloads
//! over a pluggable [`Transport`].

pub mod fetcher;
pub mod transport;

pub use fetcher::{filename_from_url, Fetcher};
pub use transport::{HttpTransport, Response, Transport};
