use thiserror::Error;

use crate::{Axis, FieldKind};

/// Результат для операций sigfil
pub type FilResult<T> = std::result::Result<T, FilError>;

/// Укрупнённая категория ошибки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Нарушение бинарного формата или схемы заголовка
    Format,
    /// Размер оси не согласован с запрошенной операцией
    Dimension,
    /// Поток не удалось прочитать или записать полностью
    Io,
}

/// Типы ошибок sigfil.
#[derive(Debug, Error)]
pub enum FilError {
    /// Поток не начинается с HEADER_START
    #[error("Invalid magic: expected HEADER_START, found {0:?}")]
    InvalidMagic(String),

    /// Поток закончился раньше, чем ожидалось
    #[error("Truncated stream: need {needed} bytes at offset {offset}, only {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Ключ заголовка отсутствует в схеме
    #[error("Unknown header key: {0:?}")]
    UnknownKey(String),

    /// Тип значения не совпадает со схемой
    #[error("Type mismatch for header key {key:?}: schema says {expected:?}, got {found:?}")]
    TypeMismatch {
        key: String,
        expected: FieldKind,
        found: FieldKind,
    },

    /// Разрядность вне {8, 16, 32}
    #[error("Unsupported bit depth: {0}")]
    UnsupportedBitDepth(u32),

    /// Нарушение спецификации формата
    #[error("Format violation: {0}")]
    FormatViolation(String),

    /// Фактор не делит ось нацело
    #[error(
        "Dimension error: {axis} axis of size {size} ({key}) is not divisible by {factor}",
        key = .axis.header_key()
    )]
    Dimension { axis: Axis, size: usize, factor: usize },

    /// Поддиапазон выходит за пределы оси
    #[error(
        "Invalid {axis} range {start}..{end} for axis of size {size} ({key})",
        key = .axis.header_key()
    )]
    InvalidRange {
        axis: Axis,
        start: usize,
        end: usize,
        size: usize,
    },

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FilError {
    pub fn format_violation<S: Into<String>>(s: S) -> Self {
        Self::FormatViolation(s.into())
    }

    pub fn invalid_magic<S: Into<String>>(s: S) -> Self {
        Self::InvalidMagic(s.into())
    }

    pub fn unknown_key<S: Into<String>>(s: S) -> Self {
        Self::UnknownKey(s.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FilError::Dimension { .. } | FilError::InvalidRange { .. } => ErrorKind::Dimension,
            FilError::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_taxonomy() {
        assert_eq!(FilError::invalid_magic("NOPE").kind(), ErrorKind::Format);
        assert_eq!(FilError::unknown_key("foo").kind(), ErrorKind::Format);
        assert_eq!(
            FilError::Truncated {
                offset: 0,
                needed: 4,
                available: 1
            }
            .kind(),
            ErrorKind::Format
        );
        assert_eq!(
            FilError::Dimension {
                axis: Axis::Channel,
                size: 10,
                factor: 3
            }
            .kind(),
            ErrorKind::Dimension
        );

        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(FilError::from(io).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_dimension_message() {
        let err = FilError::Dimension {
            axis: Axis::Sample,
            size: 7,
            factor: 2,
        };
        assert_eq!(
            err.to_string(),
            "Dimension error: sample axis of size 7 (nsamples) is not divisible by 2"
        );

        let err = FilError::InvalidRange {
            axis: Axis::Channel,
            start: 2,
            end: 6,
            size: 4,
        };
        assert_eq!(
            err.to_string(),
            "Invalid channel range 2..6 for axis of size 4 (nchans)"
        );
    }
}
