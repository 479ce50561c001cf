//! Error type shared by every fallible operation of the engine.
//!
//! Each variant maps onto one [`ErrorKind`]; the boundary layer turns the kind
//! into a numeric code (see [`ErrorKind::code`]).

use std::path::PathBuf;
use std::str::Utf8Error;

use thiserror::Error;

/// Failure taxonomy reported across the call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Encoding,
    Range,
    Io,
    NotFound,
    GameOver,
}

impl ErrorKind {
    /// Numeric code used at the boundary. Code 0 is reserved for caught panics.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::Encoding => 1,
            ErrorKind::Range => 2,
            ErrorKind::Io => 3,
            ErrorKind::NotFound => 4,
            ErrorKind::GameOver => 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid encoding: {0}")]
    Encoding(#[from] Utf8Error),

    #[error("{0}")]
    Range(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid database file: {0}")]
    Format(String),

    #[error("database file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("game over: state {0:#07x} has no remaining categories")]
    GameOver(u32),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Encoding(_) => ErrorKind::Encoding,
            Error::Range(_) => ErrorKind::Range,
            Error::Io(_) | Error::Format(_) => ErrorKind::Io,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::GameOver(_) => ErrorKind::GameOver,
        }
    }

    pub(crate) fn range(msg: impl Into<String>) -> Self {
        Error::Range(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
