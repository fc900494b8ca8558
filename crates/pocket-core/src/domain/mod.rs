// ============================================================================
//  DOMAIN LAYER
// ============================================================================

//! Core domain layer for pocket.
//!
//! Pure data and parsing: placeholder tokens, JSON path digging, pocket and
//! clone descriptors, route directives and fetch descriptors. Nothing here
//! touches the page, the network or a clock; those arrive through the ports
//! defined in the application layer.
//!
//! ## Rules
//!
//! - **No async**: domain logic is synchronous
//! - **No I/O**: no network, storage or page access
//! - **Value semantics**: every type is `Clone + PartialEq`

pub mod class_directive;
pub mod common;
pub mod entities;
pub mod error;
pub mod placeholder;
pub mod value_objects;

pub use class_directive::{FormatClass, HydrateClass};

pub use common::{alpha_only, dig, display_value, is_truthy, parse_json, JOIN_ALL_SEGMENT};

pub use entities::{
    directive::{Directive, DirectiveEntry},
    pocket::{
        parse_template_list, source_attr, Activatable, ClassElement, CloneMarker, Pocket,
        TemplateRef, Trigger, CLONED_CLASS_PREFIX, CLONE_CLASS, DATA_ATTR, EMPTY_TEMPLATE,
        LOADING_TEMPLATE, SOURCE_ATTR, TEMPLATES_ATTR,
    },
    request::{FetchRequest, FetchResponse, FetchSettings, FlightStage, RequestBody, RequestRecord},
};

pub use error::{DomainError, ErrorCategory};

pub use placeholder::{Augment, Placeholder, PlaceholderKind};

pub use value_objects::{
    CachePolicy, EntryKind, HttpMethod, LockState, NodeId, RedirectPolicy, StorageTier,
};
