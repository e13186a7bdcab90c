//! Predicate combinator engine: composable boolean conditions over `EventData`.

pub mod builtins;
pub mod pattern;
pub mod predicate;

pub use builtins::*;
pub use pattern::{wildcard_to_regex, TextPattern};
pub use predicate::{all, any, Leaf, Predicate, PredicateNode};
