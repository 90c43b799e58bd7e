pub mod binding;
pub mod commands;
pub mod descriptor;
pub mod dispatcher;
pub mod effects;
pub mod error;
pub mod invoke;
pub mod lifecycle;
pub mod progress;
pub mod request;
pub mod runner;
pub mod url;

pub use commands::Command;
pub use descriptor::{Descriptor, DescriptorId, ElementSettings, RequestHandle};
pub use error::AjaxError;
pub use lifecycle::{Completion, DomEvent, EventOutcome, LifecycleState, PendingRequest};
pub use runner::{submit_blocking, trigger_and_wait};
