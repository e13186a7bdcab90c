use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::time::Duration;

use super::r#trait::WindowAttributes;
use crate::events::{Monitor, MonitorId, Rect, WindowHandle, WindowSnapshot};

/// Таблица окон в памяти: для тестов, dry-run и интеграций, которые сами
/// поддерживают состояние окон
#[derive(Default)]
pub struct MemoryWindows {
    windows: DashMap<WindowHandle, WindowSnapshot>,
    monitors: RwLock<Vec<Monitor>>,
    idle: RwLock<Option<Duration>>,
}

impl MemoryWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_monitors(monitors: Vec<Monitor>) -> Self {
        let windows = Self::new();
        windows.set_monitors(monitors);
        windows
    }

    pub fn set_monitors(&self, monitors: Vec<Monitor>) {
        *self.monitors.write() = monitors;
    }

    pub fn monitors(&self) -> Vec<Monitor> {
        self.monitors.read().clone()
    }

    /// Задать время простоя, которое увидят подписки на простой
    pub fn set_idle_time(&self, idle: Option<Duration>) {
        *self.idle.write() = idle;
    }

    /// Добавить или заменить окно
    pub fn insert(&self, window: WindowSnapshot) {
        self.windows.insert(window.handle, window);
    }

    /// Изменить окно на месте; `false`, если окна нет
    pub fn update<F>(&self, handle: WindowHandle, f: F) -> bool
    where
        F: FnOnce(&mut WindowSnapshot),
    {
        match self.windows.get_mut(&handle) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, handle: WindowHandle) -> Option<WindowSnapshot> {
        self.windows.remove(&handle).map(|(_, window)| window)
    }

    pub fn handles(&self) -> Vec<WindowHandle> {
        let mut handles: Vec<WindowHandle> = self.windows.iter().map(|entry| *entry.key()).collect();
        handles.sort();
        handles
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl WindowAttributes for MemoryWindows {
    fn resolve(&self, handle: WindowHandle) -> Option<WindowSnapshot> {
        self.windows.get(&handle).map(|entry| entry.value().clone())
    }

    fn monitors_touched_by(&self, rect: &Rect) -> BTreeSet<MonitorId> {
        self.monitors
            .read()
            .iter()
            .filter(|monitor| monitor.work_area.overlap_area(rect) > 0)
            .map(|monitor| monitor.id)
            .collect()
    }

    fn idle_time(&self) -> Option<Duration> {
        *self.idle.read()
    }
}
