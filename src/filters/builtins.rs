//! Built-in leaf predicates.
//!
//! Every predicate that needs a window treats an absent window (no handle, or
//! the window closed before it could be resolved) as "does not match".

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use super::pattern::{wildcard_to_regex, TextPattern};
use super::predicate::PredicateNode;
use crate::error::Result;
use crate::events::{EventCode, EventData, MonitorId, Rect, WindowSnapshot};

/// Лист, требующий окна: без окна всегда `false`
fn window_leaf<F>(name: String, test: F) -> PredicateNode
where
    F: Fn(&WindowSnapshot) -> bool + Send + Sync + 'static,
{
    PredicateNode::leaf(name, move |data: &EventData| data.window().is_some_and(&test))
}

/// Заголовки служебных окон, которые почти никогда не интересны пользователю
const SYSTEM_INTERNAL_TITLES: &[&str] = &[
    "OLEChannelWnd",
    "OleMainThreadWndName",
    "Default IME",
    "MSCTFIME UI",
    "DDE Server Window",
    "CicMarshalWnd",
    "OfficePowerManagerWindow",
    "System Clock, *",
    "System Promoted Notification Area",
    "Tray Input Indicator",
    "Action Center, *",
];

static SYSTEM_INTERNAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    SYSTEM_INTERNAL_TITLES
        .iter()
        .filter_map(|title| Regex::new(&wildcard_to_regex(title)).ok())
        .collect()
});

/// Проверить, принадлежит ли заголовок служебному окну системы
pub fn is_system_internal_title(title: &str) -> bool {
    SYSTEM_INTERNAL_PATTERNS.iter().any(|re| re.is_match(title))
}

/// Заголовок окна соответствует шаблону
pub fn title(pattern: TextPattern) -> PredicateNode {
    window_leaf(format!("title({})", pattern), move |w| pattern.matches(&w.title))
}

/// Класс окна соответствует шаблону
pub fn class_name(pattern: TextPattern) -> PredicateNode {
    window_leaf(format!("class_name({})", pattern), move |w| pattern.matches(&w.class_name))
}

/// `width < max_width И height < max_height`
pub fn size_less_than(max_width: u32, max_height: u32) -> PredicateNode {
    window_leaf(
        format!("size_less_than({}x{})", max_width, max_height),
        move |w| w.width < max_width && w.height < max_height,
    )
}

/// `width * height < area`
pub fn area_less_than(area: u64) -> PredicateNode {
    window_leaf(format!("area_less_than({})", area), move |w| {
        u64::from(w.width) * u64::from(w.height) < area
    })
}

/// Левый верхний угол окна внутри прямоугольника (включая границы)
pub fn origin_within(rect: Rect) -> PredicateNode {
    window_leaf(format!("origin_within({})", rect), move |w| rect.contains(w.position))
}

/// Окно перекрывает рабочую область монитора; с `exclusive` только этого монитора
pub fn touches_monitor(id: MonitorId, exclusive: bool) -> PredicateNode {
    window_leaf(
        format!("touches_monitor({}, exclusive={})", id, exclusive),
        move |w| {
            if exclusive {
                w.monitors_touched.len() == 1 && w.monitors_touched.contains(&id)
            } else {
                w.monitors_touched.contains(&id)
            }
        },
    )
}

/// Окно касается всех указанных мониторов; с `exclusive` ровно этих мониторов
pub fn touches_monitors(ids: impl IntoIterator<Item = MonitorId>, exclusive: bool) -> PredicateNode {
    let ids: BTreeSet<MonitorId> = ids.into_iter().collect();
    window_leaf(
        format!("touches_monitors({:?}, exclusive={})", ids, exclusive),
        move |w| {
            if exclusive {
                w.monitors_touched == ids
            } else {
                ids.is_subset(&w.monitors_touched)
            }
        },
    )
}

pub fn is_maximized() -> PredicateNode {
    window_leaf("is_maximized".to_string(), |w| w.is_maximized)
}

pub fn is_minimized() -> PredicateNode {
    window_leaf("is_minimized".to_string(), |w| w.is_minimized)
}

pub fn is_active() -> PredicateNode {
    window_leaf("is_active".to_string(), |w| w.is_active)
}

/// У события есть живое окно
pub fn require_window() -> PredicateNode {
    window_leaf("require_window".to_string(), |_| true)
}

/// У окна непустой заголовок
pub fn require_titled_window() -> PredicateNode {
    window_leaf("require_titled_window".to_string(), |w| !w.title.is_empty())
}

/// Отсекает события без окна, окна без заголовка и служебные окна системы
pub fn exclude_system_windows() -> PredicateNode {
    window_leaf("exclude_system_windows".to_string(), |w| {
        !w.title.is_empty() && !is_system_internal_title(&w.title)
    })
}

/// Отсекает события с перечисленными кодами. Окно не требуется.
pub fn exclude_window_events(codes: impl IntoIterator<Item = EventCode>) -> PredicateNode {
    let codes: HashSet<EventCode> = codes.into_iter().collect();
    PredicateNode::leaf(
        format!("exclude_window_events({} codes)", codes.len()),
        move |data: &EventData| !codes.contains(&data.code()),
    )
}

/// Отсекает пары (шаблон заголовка, код события)
pub fn exclude_titled_events(pairs: Vec<(TextPattern, EventCode)>) -> PredicateNode {
    PredicateNode::leaf(
        format!("exclude_titled_events({} pairs)", pairs.len()),
        move |data: &EventData| {
            let Some(window) = data.window() else {
                return false;
            };
            !pairs
                .iter()
                .any(|(pattern, code)| *code == data.code() && pattern.matches(&window.title))
        },
    )
}

/// Система простаивает не меньше `min`. Без сведений о простое `false`.
pub fn idle_time_gte(min: Duration) -> PredicateNode {
    PredicateNode::leaf(format!("idle_time_gte({:?})", min), move |data: &EventData| {
        data.idle_time().is_some_and(|idle| idle >= min)
    })
}

/// Лист с фиксированным результатом
pub fn constant(value: bool) -> PredicateNode {
    PredicateNode::leaf(if value { "true" } else { "false" }, move |_| value)
}

/// Конструктор фильтров по заголовку с чувствительностью к регистру из конфигурации
#[derive(Debug, Clone, Copy)]
pub struct FilterFactory {
    case_sensitive_titles: bool,
}

impl FilterFactory {
    pub fn new(case_sensitive_titles: bool) -> Self {
        Self { case_sensitive_titles }
    }

    pub fn case_sensitive_titles(&self) -> bool {
        self.case_sensitive_titles
    }

    pub fn title_exact(&self, text: &str) -> PredicateNode {
        title(TextPattern::exact(text, self.case_sensitive_titles))
    }

    pub fn title_wildcard(&self, pattern: &str) -> Result<PredicateNode> {
        Ok(title(TextPattern::wildcard(pattern, self.case_sensitive_titles)?))
    }

    pub fn title_regex(&self, pattern: &str) -> Result<PredicateNode> {
        Ok(title(TextPattern::regex(pattern, self.case_sensitive_titles)?))
    }
}

impl Default for FilterFactory {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Point, RawEvent, WindowHandle};

    fn event_with(code: EventCode, window: Option<WindowSnapshot>) -> EventData {
        let handle = window.as_ref().map(|w| w.handle);
        EventData::with_window(&RawEvent::new(code, handle), window)
    }

    fn window(title: &str, width: u32, height: u32) -> WindowSnapshot {
        WindowSnapshot::new(WindowHandle(1), title).with_geometry(Point::new(100, 100), width, height)
    }

    fn on_monitors(ids: &[u32]) -> WindowSnapshot {
        let mut w = window("Multi", 10, 10);
        w.monitors_touched = ids.iter().copied().map(MonitorId).collect();
        w
    }

    #[test]
    fn test_system_internal_titles() {
        assert!(is_system_internal_title("Default IME"));
        assert!(is_system_internal_title("System Clock, 12:00"));
        assert!(!is_system_internal_title("Notepad"));
        assert!(!is_system_internal_title("default ime"));
    }

    #[test]
    fn test_absent_window_never_matches() {
        let data = event_with(EventCode::OBJECT_CREATE, None);
        for node in [
            title(TextPattern::exact("x", true)),
            size_less_than(1000, 1000),
            area_less_than(1_000_000),
            origin_within(Rect::new(Point::new(-1000, -1000), Point::new(1000, 1000))),
            touches_monitor(MonitorId(1), false),
            is_maximized(),
            is_minimized(),
            require_window(),
            exclude_system_windows(),
        ] {
            assert!(!node.evaluate(&data), "{} matched without window", node);
        }
    }

    #[test]
    fn test_size_less_than() {
        let small = event_with(EventCode::OBJECT_CREATE, Some(window("a", 150, 150)));
        let large = event_with(EventCode::OBJECT_CREATE, Some(window("a", 300, 300)));
        let edge = event_with(EventCode::OBJECT_CREATE, Some(window("a", 200, 150)));

        assert!(size_less_than(200, 200).evaluate(&small));
        assert!(!size_less_than(200, 200).evaluate(&large));
        assert!(!size_less_than(200, 200).evaluate(&edge));
        assert!(area_less_than(22_501).evaluate(&small));
        assert!(!area_less_than(22_500).evaluate(&small));
    }

    #[test]
    fn test_origin_within_is_inclusive() {
        let data = event_with(EventCode::OBJECT_LOCATIONCHANGE, Some(window("a", 10, 10)));
        assert!(origin_within(Rect::new(Point::new(100, 100), Point::new(200, 200))).evaluate(&data));
        assert!(origin_within(Rect::new(Point::new(0, 0), Point::new(100, 100))).evaluate(&data));
        assert!(!origin_within(Rect::new(Point::new(101, 0), Point::new(200, 200))).evaluate(&data));
    }

    #[test]
    fn test_touches_monitor() {
        let one = event_with(EventCode::OBJECT_CREATE, Some(on_monitors(&[1])));
        let two = event_with(EventCode::OBJECT_CREATE, Some(on_monitors(&[1, 2])));

        assert!(touches_monitor(MonitorId(1), false).evaluate(&one));
        assert!(touches_monitor(MonitorId(1), true).evaluate(&one));
        assert!(touches_monitor(MonitorId(1), false).evaluate(&two));
        assert!(!touches_monitor(MonitorId(1), true).evaluate(&two));
        assert!(!touches_monitor(MonitorId(3), false).evaluate(&two));

        assert!(touches_monitors([MonitorId(1)], false).evaluate(&two));
        assert!(!touches_monitors([MonitorId(1)], true).evaluate(&two));
        assert!(touches_monitors([MonitorId(2), MonitorId(1)], true).evaluate(&two));
    }

    #[test]
    fn test_window_state_predicates() {
        let data = event_with(
            EventCode::OBJECT_LOCATIONCHANGE,
            Some(window("a", 10, 10).maximized(true).active(true)),
        );
        assert!(is_maximized().evaluate(&data));
        assert!(!is_minimized().evaluate(&data));
        assert!(is_active().evaluate(&data));
    }

    #[test]
    fn test_exclude_system_windows() {
        let ime = event_with(EventCode::OBJECT_CREATE, Some(window("Default IME", 0, 0)));
        let untitled = event_with(EventCode::OBJECT_CREATE, Some(window("", 10, 10)));
        let normal = event_with(EventCode::OBJECT_CREATE, Some(window("Notepad", 10, 10)));

        assert!(!exclude_system_windows().evaluate(&ime));
        assert!(!exclude_system_windows().evaluate(&untitled));
        assert!(exclude_system_windows().evaluate(&normal));
        assert!(!require_titled_window().evaluate(&untitled));
    }

    #[test]
    fn test_exclude_window_events() {
        let node = exclude_window_events([EventCode::OBJECT_NAMECHANGE, EventCode::OBJECT_REORDER]);
        assert!(!node.evaluate(&event_with(EventCode::OBJECT_NAMECHANGE, None)));
        assert!(node.evaluate(&event_with(EventCode::OBJECT_CREATE, None)));
    }

    #[test]
    fn test_exclude_titled_events() {
        let node = exclude_titled_events(vec![(
            TextPattern::wildcard("*Explorer", true).unwrap(),
            EventCode::OBJECT_NAMECHANGE,
        )]);

        let noisy = event_with(EventCode::OBJECT_NAMECHANGE, Some(window("File Explorer", 10, 10)));
        let other_code = event_with(EventCode::OBJECT_CREATE, Some(window("File Explorer", 10, 10)));
        let other_title = event_with(EventCode::OBJECT_NAMECHANGE, Some(window("Notepad", 10, 10)));

        assert!(!node.evaluate(&noisy));
        assert!(node.evaluate(&other_code));
        assert!(node.evaluate(&other_title));
    }

    #[test]
    fn test_filter_factory_case_sensitivity() {
        let data = event_with(EventCode::OBJECT_CREATE, Some(window("Untitled - Notepad", 10, 10)));

        let sensitive = FilterFactory::default();
        assert!(sensitive.case_sensitive_titles());
        assert!(!sensitive.title_wildcard("*notepad").unwrap().evaluate(&data));
        assert!(sensitive.title_exact("Untitled - Notepad").evaluate(&data));

        let insensitive = FilterFactory::new(false);
        assert!(insensitive.title_wildcard("*notepad").unwrap().evaluate(&data));
        assert!(insensitive.title_regex("^untitled").unwrap().evaluate(&data));
        assert!(insensitive.title_regex("(").is_err());
    }

    #[test]
    fn test_constant() {
        let data = event_with(EventCode::OBJECT_CREATE, None);
        assert!(constant(true).evaluate(&data));
        assert!(!constant(false).evaluate(&data));
    }

    #[test]
    fn test_idle_time_gte() {
        let raw = RawEvent::windowless(EventCode::IDLE);
        let filter = idle_time_gte(Duration::from_secs(60));

        let idle = EventData::with_window(&raw, None).with_idle_time(Duration::from_secs(60));
        assert!(filter.evaluate(&idle));
        let busy = EventData::with_window(&raw, None).with_idle_time(Duration::from_secs(59));
        assert!(!filter.evaluate(&busy));
        assert!(!filter.evaluate(&EventData::with_window(&raw, None)));

        let windows = std::sync::Arc::new(crate::services::MemoryWindows::new());
        windows.set_idle_time(Some(Duration::from_secs(90)));
        assert!(filter.evaluate(&EventData::new(&raw, windows)));
    }
}
