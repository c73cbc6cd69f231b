use thiserror::Error;

pub type DedisperseResult<T> = std::result::Result<T, DedisperseError>;

#[derive(Debug, Error)]
pub enum DedisperseError {
    /// Ошибка формата или размерности filterbank
    #[error("Filterbank error: {0}")]
    Filterbank(#[from] sigfil_types::FilError),

    /// Ошибка чтения или записи
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка вывода сводки заголовка
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Противоречивые параметры запуска
    #[error("Configuration error: {0}")]
    Config(String),
}
