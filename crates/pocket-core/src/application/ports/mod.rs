//! Application ports (traits) for external dependencies.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: called by the application, implemented by infrastructure
//!   - `Fetcher`: network requests
//!   - `Page`: the document being rendered
//!   - `SessionStorage`: the session data tier
//!   - `Clock`: wall-clock time for freshness
//!   - `ValueFormatter`: named value transforms
//!
//! - **Driving (Input) Ports**: the `Framework` operations, called by hosts

pub mod output;

pub use output::{Clock, Fetcher, Location, Page, SessionStorage, ValueFormatter};

#[cfg(test)]
pub use output::{MockClock, MockFetcher};
