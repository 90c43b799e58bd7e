pub mod global;
pub mod merge;

pub use global::{PageState, Settings, is_truthy, value_to_string};
