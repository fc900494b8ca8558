//! Application layer for pocket.
//!
//! This layer contains:
//! - **Services**: the store, cache ledger and render engine
//! - **Ports**: traits for the page, network, session storage, clock and formatter
//! - **Hooks**: user callbacks invoked at fixed points of a cycle
//! - **Framework**: the assembled facade a host drives
//!
//! Placeholder grammar, directives and other pure rules live in `crate::domain`.

pub mod error;
pub mod framework;
pub mod hooks;
pub mod ports;
pub mod services;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use framework::{Framework, FrameworkBuilder};
pub use hooks::{CloneArgs, HookError, HookResult, Hooks, HooksBuilder};
pub use services::{CacheLedger, CyclePhase, CycleReport, RenderEngine, Store};
pub use settings::Settings;

pub use error::ApplicationError;
