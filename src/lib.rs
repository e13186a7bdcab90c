//! Подписка на системные события окон.
//!
//! Поток сырых событий от внешнего источника проходит через реестр диапазонов
//! кодов и дерево предикатов над атрибутами окна; совпавшие обработчики
//! вызываются строго в порядке регистрации.
//!
//! ```no_run
//! use std::sync::Arc;
//! use winevents::filters::size_less_than;
//! use winevents::services::{Dispatcher, DispatcherOptions, MemoryWindows, ScriptedEventSource};
//!
//! # async fn demo() -> winevents::Result<()> {
//! let dispatcher = Dispatcher::new(
//!     Box::new(ScriptedEventSource::new(Vec::new())),
//!     Arc::new(MemoryWindows::new()),
//!     DispatcherOptions::default(),
//! );
//!
//! dispatcher
//!     .on_create()
//!     .filter(size_less_than(200, 200))
//!     .each(|data| println!("{}", data))?;
//!
//! dispatcher.run(None).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod filters;
pub mod idle;
pub mod listen;
pub mod registry;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{Result, WinEventError};
pub use events::{EventCode, EventData, EventRange, RawEvent, WindowHandle, WindowSnapshot};
pub use filters::{all, any, PredicateNode};
pub use idle::NewIdleWatch;
pub use listen::{IdleListen, Listen, Shortcut, Subscription};
pub use registry::{InterestId, NewInterest, Signal};
pub use services::{Dispatcher, DispatcherOptions, DispatcherState, RunReport, StopReason};
