//! Registration façade: shortcuts and the two-phase `listen(...).filter(...).call(...)` builder.

pub mod builder;
pub mod shortcut;

pub use builder::{IdleListen, Listen, Subscription};
pub use shortcut::Shortcut;
