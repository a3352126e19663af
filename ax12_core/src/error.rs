use thiserror::Error;

/// Fatal bus bring-up failures. Surfaced once, never retried by the core.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    #[error("cannot open servo serial port")]
    PortOpenFailed,
    #[error("cannot create bus lock")]
    MutexCreateFailed,
    #[error("bus initialization failed with status {0}")]
    Unknown(i32),
}

impl InitError {
    /// Map a negative transport status onto the fixed init table.
    #[must_use]
    pub fn from_status(code: i32) -> Self {
        match code {
            -1 => Self::PortOpenFailed,
            -2 => Self::MutexCreateFailed,
            other => Self::Unknown(other),
        }
    }
}

/// Per-exchange failures, mapped from negative transport status codes.
/// Byte-level retry lives in the transport; the core never auto-retries.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CommError {
    #[error("serial port not initialized")]
    NotInitialized,
    #[error("wrong checksum in answer")]
    BadChecksum,
    #[error("target and answer id mismatch")]
    IdMismatch,
    #[error("timeout waiting for answer")]
    Timeout,
    #[error("callback buffer is full")]
    CallbackBufferFull,
    #[error("exchange failed with status {0}")]
    Unknown(i32),
}

impl CommError {
    /// Map a negative transport status onto the fixed comm table.
    #[must_use]
    pub fn from_status(code: i32) -> Self {
        match code {
            -1 => Self::NotInitialized,
            -2 => Self::BadChecksum,
            -3 => Self::IdMismatch,
            -4 => Self::Timeout,
            -5 => Self::CallbackBufferFull,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum AxError {
    #[error("bus init: {0}")]
    Init(#[from] InitError),
    #[error("servo communication: {0}")]
    Comm(#[from] CommError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
