use std::error::Error;
use std::fmt;
use std::io;

use crate::document::SyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    Syntax,
    Schema,
    InvalidState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
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

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Schema, message)
    }

    /// Wrap an I/O failure on a named file.
    pub fn io(context: impl fmt::Display, err: io::Error) -> Self {
        Self::new(CoreErrorCode::Io, format!("{context}: {err}"))
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CoreError {}

impl From<SyntaxError> for CoreError {
    fn from(err: SyntaxError) -> Self {
        Self::new(CoreErrorCode::Syntax, err.to_string())
    }
}

impl From<io::Error> for CoreError {
    fn from(err: io::Error) -> Self {
        Self::new(CoreErrorCode::Io, err.to_string())
    }
}
