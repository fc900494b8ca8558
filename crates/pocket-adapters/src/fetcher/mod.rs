//! Fetcher adapters.
//!
//! - [`HttpFetcher`]: real network requests through reqwest
//! - [`FileFetcher`]: serves sources from a local directory
//! - [`StubFetcher`]: canned responses for tests and dry runs

mod file;
mod http;
mod stub;

pub use file::FileFetcher;
pub use http::HttpFetcher;
pub use stub::StubFetcher;
