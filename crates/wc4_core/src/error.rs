use std::io;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoreErrorCode {
    /// The byte stream ended before a required field.
    TruncatedInput,
    /// Decoded data breaks a format rule (corrupt or unsupported save).
    InvariantViolation,
    /// A patch value does not fit the declared field width.
    ValueOverflow,
    /// A registry key was never recorded during decode.
    UnknownOffsetKey,
    /// A patch offset or region reaches past the end of the file.
    OffsetOutOfRange,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        Self::new(
            CoreErrorCode::TruncatedInput,
            format!("need {needed} bytes at offset {offset}, only {available} remain"),
        )
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::InvariantViolation, message)
    }

    pub fn io(context: impl AsRef<str>, err: io::Error) -> Self {
        Self::new(CoreErrorCode::Io, format!("{}: {err}", context.as_ref()))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
