//! Page adapters.

pub mod dom;
pub mod memory;

pub use dom::Dom;
pub use memory::{MemoryPage, TEMPLATE_CONTAINER_ID};
