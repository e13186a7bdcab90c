use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WinEventError;
use crate::events::{EventCode, EventRange};

/// Именованные наборы событий; каждый соответствует ровно одному диапазону
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shortcut {
    Create,
    Destroy,
    /// Создание или уничтожение
    ExistenceChange,
    Show,
    Hide,
    Foreground,
    Focus,
    NameChange,
    LocationChange,
    /// Отдельного события нет: это `LocationChange`, состояние проверяет `is_maximized()`
    Maximize,
    Minimize,
    Restore,
    MoveSizeStart,
    MoveSizeEnd,
    CaptureMouse,
    LostMouseCapture,
    AnyEvent,
}

impl Shortcut {
    pub const ALL: [Shortcut; 17] = [
        Shortcut::Create,
        Shortcut::Destroy,
        Shortcut::ExistenceChange,
        Shortcut::Show,
        Shortcut::Hide,
        Shortcut::Foreground,
        Shortcut::Focus,
        Shortcut::NameChange,
        Shortcut::LocationChange,
        Shortcut::Maximize,
        Shortcut::Minimize,
        Shortcut::Restore,
        Shortcut::MoveSizeStart,
        Shortcut::MoveSizeEnd,
        Shortcut::CaptureMouse,
        Shortcut::LostMouseCapture,
        Shortcut::AnyEvent,
    ];

    pub fn range(self) -> EventRange {
        let single = EventRange::single;
        match self {
            Shortcut::Create => single(EventCode::OBJECT_CREATE),
            Shortcut::Destroy => single(EventCode::OBJECT_DESTROY),
            Shortcut::ExistenceChange => EventRange::spanning(EventCode::OBJECT_CREATE, EventCode::OBJECT_DESTROY),
            Shortcut::Show => single(EventCode::OBJECT_SHOW),
            Shortcut::Hide => single(EventCode::OBJECT_HIDE),
            Shortcut::Foreground => single(EventCode::SYSTEM_FOREGROUND),
            Shortcut::Focus => single(EventCode::OBJECT_FOCUS),
            Shortcut::NameChange => single(EventCode::OBJECT_NAMECHANGE),
            Shortcut::LocationChange | Shortcut::Maximize => single(EventCode::OBJECT_LOCATIONCHANGE),
            Shortcut::Minimize => single(EventCode::SYSTEM_MINIMIZESTART),
            Shortcut::Restore => single(EventCode::SYSTEM_MINIMIZEEND),
            Shortcut::MoveSizeStart => single(EventCode::SYSTEM_MOVESIZESTART),
            Shortcut::MoveSizeEnd => single(EventCode::SYSTEM_MOVESIZEEND),
            Shortcut::CaptureMouse => single(EventCode::SYSTEM_CAPTURESTART),
            Shortcut::LostMouseCapture => single(EventCode::SYSTEM_CAPTUREEND),
            Shortcut::AnyEvent => EventRange::all(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Shortcut::Create => "create",
            Shortcut::Destroy => "destroy",
            Shortcut::ExistenceChange => "existence_change",
            Shortcut::Show => "show",
            Shortcut::Hide => "hide",
            Shortcut::Foreground => "foreground",
            Shortcut::Focus => "focus",
            Shortcut::NameChange => "name_change",
            Shortcut::LocationChange => "location_change",
            Shortcut::Maximize => "maximize",
            Shortcut::Minimize => "minimize",
            Shortcut::Restore => "restore",
            Shortcut::MoveSizeStart => "move_size_start",
            Shortcut::MoveSizeEnd => "move_size_end",
            Shortcut::CaptureMouse => "capture_mouse",
            Shortcut::LostMouseCapture => "lost_mouse_capture",
            Shortcut::AnyEvent => "any_event",
        }
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shortcut {
    type Err = WinEventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Shortcut::ALL
            .into_iter()
            .find(|shortcut| shortcut.as_str() == normalized)
            .ok_or_else(|| WinEventError::Registration(format!("неизвестный набор событий '{}'", s)))
    }
}

impl From<Shortcut> for EventRange {
    fn from(shortcut: Shortcut) -> Self {
        shortcut.range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_ranges() {
        assert_eq!(Shortcut::Destroy.range(), EventRange::single(EventCode::OBJECT_DESTROY));
        assert_eq!(Shortcut::Maximize.range(), Shortcut::LocationChange.range());

        let existence = Shortcut::ExistenceChange.range();
        assert!(existence.contains(EventCode::OBJECT_CREATE));
        assert!(existence.contains(EventCode::OBJECT_DESTROY));
        assert!(!existence.contains(EventCode::OBJECT_SHOW));

        assert_eq!(Shortcut::AnyEvent.range(), EventRange::all());
    }

    #[test]
    fn test_parse_names() {
        for shortcut in Shortcut::ALL {
            assert_eq!(shortcut.as_str().parse::<Shortcut>().unwrap(), shortcut);
        }
        assert_eq!("Location-Change".parse::<Shortcut>().unwrap(), Shortcut::LocationChange);
        assert!("resize".parse::<Shortcut>().is_err());
    }
}
