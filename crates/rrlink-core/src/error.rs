//! Error handling for rrlink
//!
//! Provides error types for every layer of the driver:
//! - Protocol errors (local framing and queueing failures)
//! - Connection errors (transport open/read/write)
//! - Reply errors (problems found in firmware replies)
//!
//! Protocol and connection errors are returned synchronously at the call
//! site. Reply errors are never returned: they describe one line among many
//! and are delivered through the device's error callback instead.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Protocol error type
///
/// Represents local failures while queueing or framing a block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Block (or its framing) does not fit the fixed buffer
    #[error("Block too large: {len} bytes exceeds the {max} byte limit")]
    BlockTooLarge {
        /// Length of the offending block or frame.
        len: usize,
        /// The limit that was exceeded.
        max: usize,
    },

    /// No encoder exists for the requested dialect
    #[error("Unsupported protocol dialect: {dialect}")]
    UnsupportedProto {
        /// The dialect name that was requested.
        dialect: String,
    },
}

/// Connection error type
///
/// Represents errors from the transport underneath the protocol engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// No transport is bound to the device
    #[error("Device not connected")]
    NotConnected,

    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Baud rate not supported
    #[error("Baud rate {baud} not supported")]
    UnsupportedBaudRate {
        /// The unsupported baud rate.
        baud: u32,
    },

    /// Transport write failed
    #[error("Write failed: {reason}")]
    WriteFailed {
        /// The reason the write failed.
        reason: String,
    },

    /// Transport read failed
    #[error("Read failed: {reason}")]
    ReadFailed {
        /// The reason the read failed.
        reason: String,
    },

    /// The far end closed the stream
    #[error("Connection lost: end of stream")]
    ConnectionLost,

    /// Port enumeration failed
    #[error("Failed to enumerate ports: {reason}")]
    EnumerationFailed {
        /// The reason enumeration failed.
        reason: String,
    },
}

/// Reply error type
///
/// Problems detected while interpreting a firmware reply. These are reported
/// through the error callback together with the offending text; the
/// connection stays open.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyError {
    /// Line matched no known reply grammar
    #[error("Unknown reply")]
    UnknownReply,

    /// Firmware asked for a line that is no longer cached
    #[error("Resend requested for an uncached line")]
    UncachedResend,

    /// Firmware reported a fault
    #[error("Hardware fault reported by firmware")]
    HardwareFault,

    /// Firmware asked for a line that was never sent
    #[error("Resend requested for a line that was never sent")]
    UnsentResend,

    /// Resend request carried no usable line number
    #[error("Malformed resend request")]
    MalformedResendRequest,
}

/// Main error type for rrlink
///
/// A unified error type for everything returned synchronously by the
/// public API.
#[derive(Error, Debug)]
pub enum Error {
    /// Protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a protocol error
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }

    /// Check if the device should be closed and reopened after this error
    ///
    /// Read failures and end of stream are reported but leave the device
    /// usable; a failed write has left a partial block on the wire.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Connection(ConnectionError::WriteFailed { .. })
                | Error::Protocol(ProtocolError::UnsupportedProto { .. })
                | Error::Io(_)
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
