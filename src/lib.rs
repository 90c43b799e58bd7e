//! Headless Backdrop AJAX engine.
//!
//! A [`page::Page`] holds a parsed document and its settings. Attaching
//! behaviours binds AJAX descriptors to elements; triggering an element
//! serializes and submits a request through a [`transport::Transport`]; the
//! server's command list is then applied to the document.

pub mod ajax;
pub mod behaviors;
pub mod cli;
pub mod dom;
pub mod page;
pub mod settings;
pub mod trace;
pub mod transport;

pub use ajax::{AjaxError, Completion, DomEvent};
pub use page::Page;
pub use settings::Settings;
