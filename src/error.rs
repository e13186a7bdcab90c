use thiserror::Error;

use crate::events::EventCode;
use crate::registry::InterestId;

#[derive(Error, Debug)]
pub enum WinEventError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка регистрации: {0}")]
    Registration(String),

    #[error("Конфликт состояния: {0}")]
    StateConflict(String),

    #[error("Неверный шаблон '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Ошибка в обработчике #{interest} ({code}): {message}")]
    Callback {
        interest: InterestId,
        code: EventCode,
        message: String,
    },

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl WinEventError {
    pub fn registration<T>(msg: impl Into<String>) -> Result<T> {
        Err(WinEventError::Registration(msg.into()))
    }

    /// Ошибка пользовательского обработчика, которую можно отдать в ErrorSink
    pub fn is_callback(&self) -> bool {
        matches!(self, WinEventError::Callback { .. })
    }
}

pub type Result<T> = std::result::Result<T, WinEventError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! winevent_error {
    (registration, $($arg:tt)*) => {
        $crate::error::WinEventError::Registration(format!($($arg)*))
    };
    (state_conflict, $($arg:tt)*) => {
        $crate::error::WinEventError::StateConflict(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::WinEventError::Internal(format!($($arg)*))
    };
}
