pub mod codes;
pub mod data;
pub mod geometry;
pub mod range;
pub mod window;

pub use codes::EventCode;
pub use data::{EventData, EventInfo, RawEvent};
pub use geometry::{Point, Rect};
pub use range::EventRange;
pub use window::{Monitor, MonitorId, WindowHandle, WindowSnapshot};
