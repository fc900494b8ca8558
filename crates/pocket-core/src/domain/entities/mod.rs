pub mod directive;
pub mod pocket;
pub mod request;

pub use directive::{Directive, DirectiveEntry};
pub use pocket::{Activatable, ClassElement, CloneMarker, Pocket, TemplateRef, Trigger};
pub use request::{
    FetchRequest, FetchResponse, FetchSettings, FlightStage, RequestBody, RequestRecord,
};
