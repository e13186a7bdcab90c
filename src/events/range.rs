use serde::{Deserialize, Serialize};
use std::fmt;

use super::codes::EventCode;
use crate::error::{Result, WinEventError};

/// Замкнутый интервал кодов событий `[low, high]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct EventRange {
    low: EventCode,
    high: EventCode,
}

impl EventRange {
    /// Интервал с проверкой порядка границ
    pub fn new(low: EventCode, high: EventCode) -> Result<Self> {
        if low > high {
            return WinEventError::registration(format!(
                "неверный диапазон событий: {} > {}",
                low, high
            ));
        }
        Ok(Self { low, high })
    }

    pub fn single(code: EventCode) -> Self {
        Self { low: code, high: code }
    }

    /// Наименьший интервал, содержащий оба кода
    pub(crate) fn spanning(a: EventCode, b: EventCode) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// Всё пространство кодов: "любое событие"
    pub fn all() -> Self {
        Self {
            low: EventCode::MIN,
            high: EventCode::MAX,
        }
    }

    pub fn low(&self) -> EventCode {
        self.low
    }

    pub fn high(&self) -> EventCode {
        self.high
    }

    pub fn is_single(&self) -> bool {
        self.low == self.high
    }

    pub fn contains(&self, code: EventCode) -> bool {
        self.low <= code && code <= self.high
    }

    pub fn overlaps(&self, other: &EventRange) -> bool {
        self.low <= other.high && other.low <= self.high
    }
}

impl From<EventCode> for EventRange {
    fn from(code: EventCode) -> Self {
        Self::single(code)
    }
}

impl TryFrom<(EventCode, EventCode)> for EventRange {
    type Error = WinEventError;

    fn try_from((low, high): (EventCode, EventCode)) -> Result<Self> {
        Self::new(low, high)
    }
}

/// Границы в том виде, в каком они приходят из конфигурации
#[derive(Deserialize)]
struct RangeBounds {
    low: EventCode,
    high: EventCode,
}

impl TryFrom<RangeBounds> for EventRange {
    type Error = WinEventError;

    fn try_from(bounds: RangeBounds) -> Result<Self> {
        Self::new(bounds.low, bounds.high)
    }
}

impl fmt::Display for EventRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "[{}]", self.low)
        } else {
            write!(f, "[{}..={}]", self.low, self.high)
        }
    }
}
