use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::codes::EventCode;
use super::window::{WindowHandle, WindowSnapshot};
use crate::services::WindowAttributes;

/// Сырое событие от внешнего источника
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub code: EventCode,
    pub window_handle: Option<WindowHandle>,
    pub object_id: i32,
    pub child_id: i32,
    pub thread_id: u32,
    pub timestamp: Instant,
}

impl RawEvent {
    pub fn new(code: EventCode, window_handle: Option<WindowHandle>) -> Self {
        Self {
            code,
            window_handle,
            object_id: 0,
            child_id: 0,
            thread_id: 0,
            timestamp: Instant::now(),
        }
    }

    /// Событие без окна (например, звуковой сигнал системы)
    pub fn windowless(code: EventCode) -> Self {
        Self::new(code, None)
    }

    pub fn for_window(code: EventCode, handle: WindowHandle) -> Self {
        Self::new(code, Some(handle))
    }

    pub fn with_ids(mut self, object_id: i32, child_id: i32, thread_id: u32) -> Self {
        self.object_id = object_id;
        self.child_id = child_id;
        self.thread_id = thread_id;
        self
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.window_handle {
            Some(handle) => write!(f, "{} @ {}", self.code, handle),
            None => write!(f, "{} (без окна)", self.code),
        }
    }
}

/// Информация о событии в том виде, в котором её получают обработчики
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    pub code: EventCode,
    pub name: Option<&'static str>,
    pub window_handle: Option<WindowHandle>,
    pub object_id: i32,
    pub child_id: i32,
    pub thread_id: u32,
    pub timestamp: Instant,
}

impl From<&RawEvent> for EventInfo {
    fn from(raw: &RawEvent) -> Self {
        Self {
            code: raw.code,
            name: raw.code.name(),
            window_handle: raw.window_handle,
            object_id: raw.object_id,
            child_id: raw.child_id,
            thread_id: raw.thread_id,
            timestamp: raw.timestamp,
        }
    }
}

/// Данные события, передаваемые предикатам и обработчикам.
///
/// Окно разрешается лениво и не более одного раза за событие: все предикаты и
/// обработчики одного события видят один и тот же снимок, даже если окно
/// закрылось посередине обработки.
pub struct EventData {
    info: EventInfo,
    window: OnceCell<Option<WindowSnapshot>>,
    idle: OnceCell<Option<Duration>>,
    windows: Option<Arc<dyn WindowAttributes>>,
}

impl EventData {
    pub fn new(raw: &RawEvent, windows: Arc<dyn WindowAttributes>) -> Self {
        Self {
            info: EventInfo::from(raw),
            window: OnceCell::new(),
            idle: OnceCell::new(),
            windows: Some(windows),
        }
    }

    /// Данные с заранее известным окном (или его отсутствием)
    pub fn with_window(raw: &RawEvent, window: Option<WindowSnapshot>) -> Self {
        Self {
            info: EventInfo::from(raw),
            window: OnceCell::with_value(window),
            idle: OnceCell::new(),
            windows: None,
        }
    }

    /// Зафиксировать время простоя, уже измеренное диспетчером
    pub fn with_idle_time(self, idle: Duration) -> Self {
        Self {
            idle: OnceCell::with_value(Some(idle)),
            ..self
        }
    }

    pub fn info(&self) -> &EventInfo {
        &self.info
    }

    pub fn code(&self) -> EventCode {
        self.info.code
    }

    /// Снимок окна; `None`, если у события нет окна или окно уже не существует
    pub fn window(&self) -> Option<&WindowSnapshot> {
        self.window.get_or_init(|| self.resolve_window()).as_ref()
    }

    /// Время простоя системы; читается не более одного раза за событие
    pub fn idle_time(&self) -> Option<Duration> {
        *self
            .idle
            .get_or_init(|| self.windows.as_ref().and_then(|windows| windows.idle_time()))
    }

    pub fn is_window_resolved(&self) -> bool {
        self.window.get().is_some()
    }

    fn resolve_window(&self) -> Option<WindowSnapshot> {
        let handle = self.info.window_handle.filter(|h| !h.is_null())?;
        let windows = self.windows.as_ref()?;

        let mut snapshot = windows.resolve(handle)?;
        snapshot.monitors_touched = windows.monitors_touched_by(&snapshot.rect());
        Some(snapshot)
    }
}

impl fmt::Debug for EventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventData")
            .field("info", &self.info)
            .field("window", &self.window.get())
            .finish()
    }
}

impl fmt::Display for EventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.window.get() {
            Some(Some(window)) => write!(f, "{}: {}", self.info.code, window),
            Some(None) => write!(f, "{}: окно отсутствует", self.info.code),
            None => write!(f, "{}", self.info.code),
        }
    }
}
