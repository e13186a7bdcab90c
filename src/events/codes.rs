use serde::{Deserialize, Serialize};
use std::fmt;

/// Код системного события окна
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCode(pub u32);

macro_rules! event_codes {
    ($($name:ident = $value:expr),* $(,)?) => {
        impl EventCode {
            $(pub const $name: EventCode = EventCode($value);)*
        }

        /// Таблица имён для обратного поиска (без EVENT_MIN/EVENT_MAX)
        static EVENT_NAMES: &[(EventCode, &str)] = &[
            $((EventCode::$name, concat!("EVENT_", stringify!($name))),)*
        ];
    };
}

event_codes! {
    SYSTEM_SOUND = 0x0001,
    SYSTEM_ALERT = 0x0002,
    SYSTEM_FOREGROUND = 0x0003,
    SYSTEM_MENUSTART = 0x0004,
    SYSTEM_MENUEND = 0x0005,
    SYSTEM_MENUPOPUPSTART = 0x0006,
    SYSTEM_MENUPOPUPEND = 0x0007,
    SYSTEM_CAPTURESTART = 0x0008,
    SYSTEM_CAPTUREEND = 0x0009,
    SYSTEM_MOVESIZESTART = 0x000A,
    SYSTEM_MOVESIZEEND = 0x000B,
    SYSTEM_CONTEXTHELPSTART = 0x000C,
    SYSTEM_CONTEXTHELPEND = 0x000D,
    SYSTEM_DRAGDROPSTART = 0x000E,
    SYSTEM_DRAGDROPEND = 0x000F,
    SYSTEM_DIALOGSTART = 0x0010,
    SYSTEM_DIALOGEND = 0x0011,
    SYSTEM_SCROLLINGSTART = 0x0012,
    SYSTEM_SCROLLINGEND = 0x0013,
    SYSTEM_SWITCHSTART = 0x0014,
    SYSTEM_SWITCHEND = 0x0015,
    SYSTEM_MINIMIZESTART = 0x0016,
    SYSTEM_MINIMIZEEND = 0x0017,
    SYSTEM_DESKTOPSWITCH = 0x0020,
    SYSTEM_END = 0x00FF,
    OEM_DEFINED_START = 0x0101,
    OEM_DEFINED_END = 0x01FF,
    UIA_EVENTID_START = 0x4E00,
    UIA_EVENTID_END = 0x4EFF,
    UIA_PROPID_START = 0x7500,
    UIA_PROPID_END = 0x75FF,
    OBJECT_CREATE = 0x8000,
    OBJECT_DESTROY = 0x8001,
    OBJECT_SHOW = 0x8002,
    OBJECT_HIDE = 0x8003,
    OBJECT_REORDER = 0x8004,
    OBJECT_FOCUS = 0x8005,
    OBJECT_SELECTION = 0x8006,
    OBJECT_SELECTIONADD = 0x8007,
    OBJECT_SELECTIONREMOVE = 0x8008,
    OBJECT_SELECTIONWITHIN = 0x8009,
    OBJECT_STATECHANGE = 0x800A,
    OBJECT_LOCATIONCHANGE = 0x800B,
    OBJECT_NAMECHANGE = 0x800C,
    OBJECT_DESCRIPTIONCHANGE = 0x800D,
    OBJECT_VALUECHANGE = 0x800E,
    OBJECT_PARENTCHANGE = 0x800F,
    OBJECT_HELPCHANGE = 0x8010,
    OBJECT_DEFACTIONCHANGE = 0x8011,
    OBJECT_ACCELERATORCHANGE = 0x8012,
    OBJECT_INVOKED = 0x8013,
    OBJECT_TEXTSELECTIONCHANGED = 0x8014,
    OBJECT_CONTENTSCROLLED = 0x8015,
    SYSTEM_ARRANGMENTPREVIEW = 0x8016,
    OBJECT_CLOAKED = 0x8017,
    OBJECT_UNCLOAKED = 0x8018,
    OBJECT_LIVEREGIONCHANGED = 0x8019,
    OBJECT_HOSTEDOBJECTSINVALIDATED = 0x8020,
    OBJECT_DRAGSTART = 0x8021,
    OBJECT_DRAGCANCEL = 0x8022,
    OBJECT_DRAGCOMPLETE = 0x8023,
    OBJECT_DRAGENTER = 0x8024,
    OBJECT_DRAGLEAVE = 0x8025,
    OBJECT_DRAGDROPPED = 0x8026,
    OBJECT_IME_SHOW = 0x8027,
    OBJECT_IME_HIDE = 0x8028,
    OBJECT_IME_CHANGE = 0x8029,
    OBJECT_TEXTEDIT_CONVERSIONTARGETCHANGED = 0x8030,
    OBJECT_END = 0x80FF,
    AIA_START = 0xA000,
    AIA_END = 0xAFFF,
}

impl EventCode {
    /// Нижняя граница пространства кодов
    pub const MIN: EventCode = EventCode(0x0000_0001);
    /// Верхняя граница пространства кодов
    pub const MAX: EventCode = EventCode(0x7FFF_FFFF);
    /// Тик простоя системы. Лежит вне `[MIN, MAX]`, поэтому подписки на
    /// "любое событие" его не получают.
    pub const IDLE: EventCode = EventCode(0xFFFF_0001);

    pub fn new(code: u32) -> Self {
        Self(code)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Имя события (`EVENT_OBJECT_CREATE` и т.п.), если код известен
    pub fn name(&self) -> Option<&'static str> {
        if *self == Self::IDLE {
            return Some("EVENT_IDLE");
        }
        EVENT_NAMES
            .iter()
            .find(|(code, _)| code == self)
            .map(|(_, name)| *name)
    }

    /// Прямой поиск по имени; префикс `EVENT_` необязателен, регистр не важен
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_uppercase();
        let full = if upper.starts_with("EVENT_") {
            upper
        } else {
            format!("EVENT_{}", upper)
        };

        match full.as_str() {
            "EVENT_MIN" => return Some(Self::MIN),
            "EVENT_MAX" => return Some(Self::MAX),
            "EVENT_IDLE" => return Some(Self::IDLE),
            _ => {}
        }

        EVENT_NAMES
            .iter()
            .find(|(_, n)| *n == full)
            .map(|(code, _)| *code)
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "EVENT_{:#06X}", self.0),
        }
    }
}

impl From<u32> for EventCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_lookup() {
        assert_eq!(EventCode::OBJECT_CREATE.name(), Some("EVENT_OBJECT_CREATE"));
        assert_eq!(EventCode::SYSTEM_MINIMIZEEND.name(), Some("EVENT_SYSTEM_MINIMIZEEND"));
        assert_eq!(EventCode(0x1234_5678).name(), None);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(EventCode::from_name("EVENT_OBJECT_DESTROY"), Some(EventCode::OBJECT_DESTROY));
        assert_eq!(EventCode::from_name("object_locationchange"), Some(EventCode::OBJECT_LOCATIONCHANGE));
        assert_eq!(EventCode::from_name("EVENT_MAX"), Some(EventCode::MAX));
        assert_eq!(EventCode::from_name("idle"), Some(EventCode::IDLE));
        assert_eq!(EventCode::IDLE.name(), Some("EVENT_IDLE"));
        assert!(!crate::events::EventRange::all().contains(EventCode::IDLE));
        assert_eq!(EventCode::from_name("nope"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(EventCode::SYSTEM_FOREGROUND.to_string(), "EVENT_SYSTEM_FOREGROUND");
        assert_eq!(EventCode(0x42).to_string(), "EVENT_0x0042");
    }
}
