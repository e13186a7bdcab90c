use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::geometry::{Point, Rect};

/// Непрозрачный идентификатор окна; 0 означает "окна нет"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Номер монитора
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonitorId(pub u32);

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "monitor#{}", self.0)
    }
}

/// Монитор и его рабочая область (обычно без панели задач)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: MonitorId,
    pub work_area: Rect,
}

impl Monitor {
    pub fn new(id: u32, work_area: Rect) -> Self {
        Self {
            id: MonitorId(id),
            work_area,
        }
    }
}

/// Снимок атрибутов окна на момент обработки события
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub handle: WindowHandle,
    pub title: String,
    pub class_name: String,
    pub process_id: Option<u32>,
    pub position: Point,
    pub width: u32,
    pub height: u32,
    pub is_maximized: bool,
    pub is_minimized: bool,
    pub is_active: bool,
    /// Заполняется диспетчером через `WindowAttributes::monitors_touched_by`
    pub monitors_touched: BTreeSet<MonitorId>,
}

impl WindowSnapshot {
    pub fn new(handle: WindowHandle, title: impl Into<String>) -> Self {
        Self {
            handle,
            title: title.into(),
            class_name: String::new(),
            process_id: None,
            position: Point::default(),
            width: 0,
            height: 0,
            is_maximized: false,
            is_minimized: false,
            is_active: false,
            monitors_touched: BTreeSet::new(),
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.process_id = Some(pid);
        self
    }

    pub fn with_geometry(mut self, position: Point, width: u32, height: u32) -> Self {
        self.position = position;
        self.width = width;
        self.height = height;
        self
    }

    pub fn maximized(mut self, value: bool) -> Self {
        self.is_maximized = value;
        self
    }

    pub fn minimized(mut self, value: bool) -> Self {
        self.is_minimized = value;
        self
    }

    pub fn active(mut self, value: bool) -> Self {
        self.is_active = value;
        self
    }

    /// Ограничивающий прямоугольник окна
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.width, self.height)
    }
}

impl fmt::Display for WindowSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.class_name.is_empty() {
            write!(f, "\"{}\" [{}]", self.title, self.handle)
        } else {
            write!(f, "\"{}\" ({}) [{}]", self.title, self.class_name, self.handle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_snapshot_creation() {
        let window = WindowSnapshot::new(WindowHandle(7), "Test Window")
            .with_class("TestApp")
            .with_pid(1234)
            .with_geometry(Point::new(10, 20), 300, 200)
            .maximized(true);

        assert_eq!(window.title, "Test Window");
        assert_eq!(window.class_name, "TestApp");
        assert_eq!(window.process_id, Some(1234));
        assert!(window.is_maximized);
        assert!(!window.is_minimized);
        assert_eq!(window.rect(), Rect::new(Point::new(10, 20), Point::new(310, 220)));
    }

    #[test]
    fn test_display() {
        let window = WindowSnapshot::new(WindowHandle(0x10), "Vim").with_class("vim");
        assert_eq!(window.to_string(), "\"Vim\" (vim) [0x10]");
        assert!(WindowHandle::NULL.is_null());
    }
}
