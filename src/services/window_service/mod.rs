//! Window attribute service: responsibility and boundaries
//!
//! This module only answers "what does this window look like right now" for the
//! dispatcher. It MUST NOT hold subscription or filtering logic; predicates
//! live in `filters` and consume the snapshots produced here.

mod memory;
mod r#trait;

pub use self::memory::MemoryWindows;
pub use self::r#trait::WindowAttributes;
