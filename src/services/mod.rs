pub mod dispatcher;
pub mod event_source;
pub mod window_service;

pub use dispatcher::{
    Dispatcher, DispatcherOptions, DispatcherState, ErrorSink, LogErrorSink, RunReport, StopReason,
};
pub use event_source::{ChannelEventSource, DryRunEventSource, EventFeed, EventSource, ScriptedEventSource};
pub use window_service::{MemoryWindows, WindowAttributes};
