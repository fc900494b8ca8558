//! Pocket Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the pocket
//! data/template lifecycle engine, following hexagonal (ports and adapters)
//! architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           pocket-cli (host)             │
//! │       (drives Framework cycles)         │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │  (RenderEngine, CacheLedger, Store)     │
//! │   fetch → cache → fill → clone → paint  │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (Fetcher, Page, SessionStorage, Clock)  │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │    pocket-adapters (Infrastructure)     │
//! │  (MemoryPage, HttpFetcher, clocks, ..)  │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │ (Placeholder, dig, Pocket, Directive)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pocket_core::application::Framework;
//!
//! # async fn run(page: std::sync::Arc<dyn pocket_core::application::ports::Page>,
//! #     fetcher: std::sync::Arc<dyn pocket_core::application::ports::Fetcher>,
//! #     session: std::sync::Arc<dyn pocket_core::application::ports::SessionStorage>,
//! #     clock: std::sync::Arc<dyn pocket_core::application::ports::Clock>,
//! #     formatter: std::sync::Arc<dyn pocket_core::application::ports::ValueFormatter>,
//! # ) -> pocket_core::error::PocketResult<()> {
//! let framework = Framework::builder()
//!     .page(page)
//!     .fetcher(fetcher)
//!     .session(session)
//!     .clock(clock)
//!     .formatter(formatter)
//!     .build()?;
//!
//! let report = framework.init().await;
//! println!("painted {} pockets", report.pockets_painted);
//! # Ok(())
//! # }
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        CacheLedger, CycleReport, Framework, FrameworkBuilder, Hooks, RenderEngine, Settings,
        Store,
        ports::{Clock, Fetcher, Page, SessionStorage, ValueFormatter},
    };
    pub use crate::domain::{
        CloneMarker, Directive, DirectiveEntry, EntryKind, FetchSettings, LockState, NodeId,
        Pocket, StorageTier, TemplateRef,
    };
    pub use crate::error::{PocketError, PocketResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
