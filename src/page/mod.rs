pub mod locale;
pub mod page;
pub mod window;

pub use page::{Binding, BindingKind, CommandHandler, Page};
pub use window::{Alert, Animation, Window};
