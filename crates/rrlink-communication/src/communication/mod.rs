//! Byte-stream transports underneath the protocol engine.
//!
//! The engine never touches a platform device API directly. It talks to a
//! [`Transport`], which is expected to behave like a non-blocking stream:
//! reads and writes return `WouldBlock` (or `TimedOut`) instead of waiting.

pub mod serial;

pub use serial::{guess_device, list_ports, SerialPortInfo, SerialTransport};

use std::io;

/// Non-blocking byte stream bound to a [`crate::Device`].
pub trait Transport: Send {
    /// Read available bytes into `buf`.
    ///
    /// `Ok(0)` means the far end closed the stream. When nothing is
    /// available the call returns `WouldBlock` or `TimedOut`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write as many bytes of `data` as the stream accepts without blocking.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Human readable name of the underlying port
    fn name(&self) -> String;

    /// Release the underlying handle
    fn close(&mut self) -> io::Result<()>;

    /// Drive the DTR control line.
    ///
    /// Links without modem control lines keep the default, which reports
    /// `Unsupported`.
    fn set_dtr(&mut self, _level: bool) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    /// Raw descriptor for callers running their own readiness loop
    #[cfg(unix)]
    fn as_raw_fd(&self) -> Option<std::os::unix::io::RawFd> {
        None
    }
}
