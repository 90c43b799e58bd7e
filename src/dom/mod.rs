pub mod document;
pub mod parser;
pub mod selector;
pub mod serialize;

pub use document::{Document, NodeData, NodeId};
pub use selector::Selector;
