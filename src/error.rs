// src/error.rs

use std::fmt;
use std::io;

/// Outcome of a rejected buffer or host operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A buffer was requested with zero capacity.
    InvalidCapacity,
    /// `init` was called on a buffer that is still live.
    AlreadyInitialized,
    /// The buffer has no backing store (never initialized or destroyed).
    NotInitialized,
    /// The backing store could not be allocated.
    AllocationFailure,
    BufferFull,
    BufferEmpty,
    /// A peek reached past the valid bytes.
    OffsetOutOfRange,
    /// The buffer was busy with another operation.
    ReentrantAccess,
    /// I/O failure in a source or sink.
    Io(io::ErrorKind),
    /// Invalid or unreadable configuration.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCapacity => write!(f, "Buffer capacity must be greater than zero"),
            Error::AlreadyInitialized => write!(f, "Buffer is already initialized"),
            Error::NotInitialized => write!(f, "Buffer is not initialized"),
            Error::AllocationFailure => write!(f, "Failed to allocate buffer storage"),
            Error::BufferFull => write!(f, "Buffer is full"),
            Error::BufferEmpty => write!(f, "Buffer is empty"),
            Error::OffsetOutOfRange => write!(f, "Offset is beyond the buffered bytes"),
            Error::ReentrantAccess => write!(f, "Buffer is busy with another operation"),
            Error::Io(kind) => write!(f, "I/O error: {}", kind),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e.kind())
    }
}

impl Error {
    /// Maps the `Error` to a C-style status code; `0` is reserved for success.
    pub fn to_status_code(&self) -> i32 {
        match self {
            Error::InvalidCapacity => -1,
            Error::AlreadyInitialized => -2,
            Error::NotInitialized => -3,
            Error::AllocationFailure => -4,
            Error::BufferFull => -5,
            Error::BufferEmpty => -6,
            Error::OffsetOutOfRange => -7,
            Error::ReentrantAccess => -8,
            Error::Io(_) => -9,
            Error::Config(_) => -10,
        }
    }
}
