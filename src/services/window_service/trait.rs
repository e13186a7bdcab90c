use std::collections::BTreeSet;
use std::time::Duration;

use crate::events::{MonitorId, Rect, WindowHandle, WindowSnapshot};

/// Чтение атрибутов окон из внешней системы.
///
/// Промах (`None`) это штатная ситуация: окно могло закрыться между событием и
/// его обработкой.
pub trait WindowAttributes: Send + Sync {
    /// Снимок окна по дескриптору; `monitors_touched` заполняет диспетчер
    fn resolve(&self, handle: WindowHandle) -> Option<WindowSnapshot>;

    /// Мониторы, рабочую область которых перекрывает прямоугольник
    fn monitors_touched_by(&self, rect: &Rect) -> BTreeSet<MonitorId>;

    /// Время с последнего ввода пользователя; `None`, если источник его не знает
    fn idle_time(&self) -> Option<Duration> {
        None
    }
}
