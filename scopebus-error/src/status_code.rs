use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde_repr")]
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Коды статуса для категоризации ошибок реестра.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Ошибки определения и поиска модулей
/// - 3xxx: Ошибки доставки событий
///
/// `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`.
#[cfg_attr(feature = "serde_repr", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Unexpected = 1002,
    Internal = 1003,
    InvalidArgs = 1004,

    // === 2xxx: Модули ===
    NotFound = 2000,
    AlreadyExists = 2001,

    // === 3xxx: Доставка событий ===
    HandlerFailed = 3000,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Ошибка вызывающей стороны: неверные аргументы или неизвестный модуль.
    pub fn is_client_error(&self) -> bool {
        let c = self.code();
        if (2000..=2999).contains(&c) {
            return true;
        }
        matches!(self, Self::InvalidArgs)
    }

    /// Ошибка, возникшая внутри пользовательского обработчика.
    pub fn is_handler_error(&self) -> bool {
        (3000..=3999).contains(&self.code())
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::AlreadyExists => LogLevel::Debug,
            Self::InvalidArgs => LogLevel::Info,
            Self::HandlerFailed => LogLevel::Warn,
            Self::Internal | Self::Unexpected | Self::Unknown => LogLevel::Error,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет разделение клиентских ошибок и ошибок обработчиков.
    #[test]
    fn test_client_vs_handler() {
        assert!(StatusCode::InvalidArgs.is_client_error());
        assert!(StatusCode::NotFound.is_client_error());
        assert!(StatusCode::AlreadyExists.is_client_error());
        assert!(!StatusCode::HandlerFailed.is_client_error());
        assert!(StatusCode::HandlerFailed.is_handler_error());
        assert!(!StatusCode::Internal.is_handler_error());
    }

    /// Тест проверяет конвертацию через `TryFrom<u32>`.
    #[test]
    fn test_try_from_u32() {
        let n = StatusCode::NotFound.code();
        assert_eq!(StatusCode::try_from(n).unwrap(), StatusCode::NotFound);
        assert!(StatusCode::try_from(99999).is_err());
    }

    /// Тест проверяет числовое представление и `From<StatusCode> for u32`.
    #[test]
    fn test_code_and_into() {
        let c = StatusCode::AlreadyExists;
        assert_eq!(c.code(), 2001);
        let n: u32 = c.into();
        assert_eq!(n, 2001);
    }

    #[test]
    fn test_log_level_mappings() {
        assert_eq!(StatusCode::Success.log_level(), LogLevel::Trace);
        assert_eq!(StatusCode::NotFound.log_level(), LogLevel::Debug);
        assert_eq!(StatusCode::HandlerFailed.log_level(), LogLevel::Warn);
        assert_eq!(StatusCode::Internal.log_level(), LogLevel::Error);
    }

    /// Тест проверяет формат `Display`: имя варианта и числовой код.
    #[test]
    fn test_display_contains_name_and_code() {
        let s = format!("{}", StatusCode::HandlerFailed);
        assert!(s.contains("3000"), "Display must contain code 3000, got: {s}");
        assert!(
            s.contains("HandlerFailed"),
            "Display must contain variant name 'HandlerFailed', got: {s}"
        );
    }
}
