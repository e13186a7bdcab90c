mod channel;
mod dry_run;
mod scripted;
mod r#trait;

pub use self::channel::{ChannelEventSource, EventFeed};
pub use self::dry_run::DryRunEventSource;
pub use self::r#trait::EventSource;
pub use self::scripted::ScriptedEventSource;
