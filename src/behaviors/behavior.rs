use std::fmt;

use serde_json::Value;

use crate::dom::{Document, NodeId};

/// Why behaviours are being detached from a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachTrigger {
    /// The subtree is about to be removed or replaced.
    Unload,
    /// Field values are about to be collected for submission.
    Serialize,
    /// The subtree is being moved within the page.
    Move,
}

impl fmt::Display for DetachTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetachTrigger::Unload => "unload",
            DetachTrigger::Serialize => "serialize",
            DetachTrigger::Move => "move",
        };
        f.write_str(name)
    }
}

/// An interactive enhancement that can be (re)initialised over a subtree.
///
/// Implementations must tolerate repeated attach calls on overlapping
/// contexts; the page calls attach after every response.
pub trait Behavior {
    fn name(&self) -> &str;

    fn attach(&self, _doc: &mut Document, _context: NodeId, _settings: &Value) {}

    fn detach(
        &self,
        _doc: &mut Document,
        _context: NodeId,
        _settings: &Value,
        _trigger: DetachTrigger,
    ) {
    }
}

/// Ordered collection of registered behaviours.
#[derive(Default)]
pub struct BehaviorRegistry {
    behaviors: Vec<Box<dyn Behavior>>,
}

impl BehaviorRegistry {
    pub fn register(&mut self, behavior: Box<dyn Behavior>) {
        self.behaviors.push(behavior);
    }

    pub fn names(&self) -> Vec<&str> {
        self.behaviors.iter().map(|b| b.name()).collect()
    }

    pub fn attach(&self, doc: &mut Document, context: NodeId, settings: &Value) {
        for behavior in &self.behaviors {
            behavior.attach(doc, context, settings);
        }
    }

    pub fn detach(
        &self,
        doc: &mut Document,
        context: NodeId,
        settings: &Value,
        trigger: DetachTrigger,
    ) {
        for behavior in &self.behaviors {
            behavior.detach(doc, context, settings, trigger);
        }
    }
}
