//! Value formatter adapters.

mod builtin;

pub use builtin::{BuiltinFormatter, FORMATS};
