//! Session storage adapters.

mod file;
mod memory;

pub use file::FileSession;
pub use memory::MemorySession;
