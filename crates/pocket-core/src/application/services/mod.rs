//! Application services - the render lifecycle.
//!
//! The store holds templates and data, the cache ledger fetches and ages
//! them, and the render engine runs the paint cycle over both.

pub mod engine;
pub mod formatting;
pub mod in_flight;
pub mod ledger;
pub mod store;
pub mod substitution;

pub use engine::{CyclePhase, CycleReport, RenderEngine};
pub use formatting::Formatting;
pub use in_flight::InFlight;
pub use ledger::{CacheLedger, FetchHandle};
pub use store::Store;
pub use substitution::{Cloner, DataLookup, Injector};
