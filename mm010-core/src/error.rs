//! Error types for dispenser operations

use mm010_protocol::{FrameError, ResponseCode, StatusCode};
use thiserror::Error;

use crate::state::FailureKind;

/// Boxed transport error
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for all dispenser operations
#[derive(Debug, Error)]
pub enum Error {
    /// Transport read or write failed. The connection stays open.
    #[error("serial I/O error: {0}")]
    Io(#[source] BoxError),

    /// Nothing usable arrived within the bounded number of reads
    #[error("read attempts exceeded ({attempts})")]
    RetryExhausted { attempts: u32 },

    /// Frame markers missing or misplaced, or a field could not be decoded
    #[error("response format invalid")]
    Format,

    /// Response checksum did not match its contents
    #[error("response verification failed")]
    Checksum,

    /// The first code byte of a reply was not ACK
    #[error("response not ACK: {0:?}")]
    ResponseNotAck(ResponseCode),

    /// The code byte after the data frame was not EOT
    #[error("response not EOT: {0:?}")]
    ResponseNotEot(ResponseCode),

    /// The device refused a parameter read or write
    #[error("illegal command: {0:?}")]
    IllegalCommand(StatusCode),

    /// The operation needs an open port
    #[error("connection closed")]
    ConnectionClosed,

    /// A caller-supplied value cannot be put on the wire
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Configuration could not be loaded or is inconsistent
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias using the driver error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap a transport error
    pub fn io<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Io(Box::new(err))
    }

    /// Category used by the cycle state machine
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Io(_) => FailureKind::Io,
            Error::RetryExhausted { .. } => FailureKind::RetryExhausted,
            Error::Format => FailureKind::Format,
            Error::Checksum => FailureKind::Checksum,
            Error::ResponseNotAck(_) => FailureKind::ResponseNotAck,
            Error::ResponseNotEot(_) => FailureKind::ResponseNotEot,
            Error::IllegalCommand(_) => FailureKind::IllegalCommand,
            Error::ConnectionClosed => FailureKind::ConnectionClosed,
            Error::InvalidArgument(_) => FailureKind::InvalidArgument,
            Error::Config(_) => FailureKind::Config,
        }
    }

    /// Returns true if the byte stream may be out of step with the device
    ///
    /// After such an error the next exchange can start mid-frame; callers
    /// usually reset the device or reopen the port.
    pub fn is_desync(&self) -> bool {
        matches!(
            self,
            Error::Format | Error::Checksum | Error::ResponseNotAck(_) | Error::ResponseNotEot(_)
        )
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::InvalidFormat => Error::Format,
            FrameError::InvalidChecksum => Error::Checksum,
            FrameError::PayloadTooLarge => Error::InvalidArgument("payload too large"),
            FrameError::ValueOutOfRange => Error::InvalidArgument("value out of range"),
            FrameError::BufferTooSmall => Error::InvalidArgument("frame buffer too small"),
        }
    }
}
