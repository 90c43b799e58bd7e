pub mod behavior;

pub use behavior::{Behavior, BehaviorRegistry, DetachTrigger};
