//! Infrastructure adapters for pocket.
//!
//! This crate implements the ports defined in `pocket-core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod clock;
pub mod fetcher;
pub mod formatter;
pub mod page;
pub mod session;
pub mod template_loader;

// Re-export commonly used adapters
pub use clock::{ManualClock, SystemClock};
pub use fetcher::{FileFetcher, HttpFetcher, StubFetcher};
pub use formatter::BuiltinFormatter;
pub use page::{Dom, MemoryPage};
pub use session::{FileSession, MemorySession};
pub use template_loader::{LoaderError, TemplateLoader};
