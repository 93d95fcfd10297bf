//! Firmware dialects
//!
//! Each dialect supplies two halves of the wire protocol:
//! - a [`BlockEncoder`] that frames outbound blocks (line numbers,
//!   checksums, feedrate injection)
//! - a [`ReplyGrammar`] that classifies complete reply lines
//!
//! The engine selects both once, from [`Dialect`], and never branches on the
//! dialect again.

pub mod fived;
pub mod simple;
pub mod telemetry;
pub mod tonokip;

pub use fived::Fived;
pub use simple::Simple;
pub use telemetry::TelemetryToken;
pub use tonokip::Tonokip;

use rrlink_core::constants::{BLOCK_TERMINATOR, SEND_BUFFER_SIZE};
use rrlink_core::{Dialect, ProtocolError};
use std::io::Write;

/// A block framed for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Exact bytes to transmit, terminator included
    pub bytes: Vec<u8>,
    /// Line number consumed by this frame, for numbered dialects
    pub line: Option<u64>,
    /// XOR checksum written after `*`, for numbered dialects
    pub checksum: Option<u8>,
}

/// Outbound half of a dialect.
pub trait BlockEncoder: Send {
    /// Dialect this encoder speaks
    fn dialect(&self) -> Dialect;

    /// Frame `block` as line `line`.
    ///
    /// Encoders for unnumbered dialects ignore `line` and return a frame
    /// whose `line` is `None`, so the caller knows not to advance its counter.
    fn encode(&self, line: u64, block: &[u8]) -> Result<Frame, ProtocolError>;
}

/// Classification of one complete reply line.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Acknowledgement, possibly carrying telemetry after the keyword
    Ack(Vec<TelemetryToken>),
    /// Firmware asks for a line to be sent again
    Resend(u64),
    /// Resend keyword without a usable line number
    MalformedResend,
    /// Unsolicited telemetry line
    Telemetry(Vec<TelemetryToken>),
    /// Firmware reported a fault
    Fault,
    /// Firmware (re)started
    Start,
    /// Matched nothing
    Unknown,
}

/// Inbound half of a dialect.
pub trait ReplyGrammar: Send {
    /// Classify one reply line, terminator already removed.
    fn classify(&self, line: &str) -> Reply;
}

/// Build the encoder for `dialect`.
pub fn encoder_for(dialect: Dialect, feedrate: u32) -> Box<dyn BlockEncoder> {
    match dialect {
        Dialect::Simple => Box::new(Simple),
        Dialect::Fived => Box::new(Fived::new(feedrate)),
        Dialect::Tonokip => Box::new(Tonokip),
    }
}

/// Build the reply grammar for `dialect`.
pub fn grammar_for(dialect: Dialect) -> Box<dyn ReplyGrammar> {
    match dialect {
        Dialect::Simple => Box::new(Simple),
        Dialect::Fived => Box::new(Fived::default()),
        Dialect::Tonokip => Box::new(Tonokip),
    }
}

/// XOR of every byte in `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Frame `N<line> <block><gap>*<checksum>\r\n`.
///
/// `gap` is inserted between the block and the `*` marker and is covered by
/// the checksum.
pub(crate) fn frame_numbered(
    line: u64,
    block: &[u8],
    gap: &[u8],
) -> Result<Frame, ProtocolError> {
    let mut bytes = Vec::with_capacity(SEND_BUFFER_SIZE);
    // Writing into a Vec cannot fail.
    let _ = write!(bytes, "N{} ", line);
    bytes.extend_from_slice(block);
    bytes.extend_from_slice(gap);

    let cs = checksum(&bytes);
    let _ = write!(bytes, "*{}", cs);
    bytes.extend_from_slice(BLOCK_TERMINATOR);

    check_frame_len(&bytes)?;
    Ok(Frame {
        bytes,
        line: Some(line),
        checksum: Some(cs),
    })
}

pub(crate) fn check_frame_len(bytes: &[u8]) -> Result<(), ProtocolError> {
    if bytes.len() > SEND_BUFFER_SIZE {
        return Err(ProtocolError::BlockTooLarge {
            len: bytes.len(),
            max: SEND_BUFFER_SIZE,
        });
    }
    Ok(())
}

/// Case-insensitive ASCII prefix strip.
pub(crate) fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let head = line.get(..keyword.len())?;
    if head.eq_ignore_ascii_case(keyword) {
        Some(&line[keyword.len()..])
    } else {
        None
    }
}

/// Parse the line number following a resend keyword.
///
/// Accepts `5`, `: 5`, `:N5` and similar; anything after the digits must be
/// whitespace.
pub(crate) fn parse_resend_line(rest: &str) -> Option<u64> {
    let rest = rest.trim_start_matches(|c: char| c == ':' || c.is_whitespace());
    let rest = rest
        .strip_prefix('N')
        .or_else(|| rest.strip_prefix('n'))
        .unwrap_or(rest);
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 || !rest[end..].chars().all(char::is_whitespace) {
        return None;
    }
    rest[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        assert_eq!(checksum(b""), 0);
        assert_eq!(checksum(b"N1 M105"), b"N1 M105".iter().fold(0, |a, b| a ^ b));
        assert_eq!(checksum(&[0x55, 0x55]), 0);
    }

    #[test]
    fn test_frame_numbered_layout() {
        let frame = frame_numbered(3, b"M105", b"").unwrap();
        let cs = checksum(b"N3 M105");
        assert_eq!(frame.bytes, format!("N3 M105*{}\r\n", cs).into_bytes());
        assert_eq!(frame.line, Some(3));
        assert_eq!(frame.checksum, Some(cs));
    }

    #[test]
    fn test_frame_numbered_too_large() {
        let block = vec![b'G'; SEND_BUFFER_SIZE];
        let err = frame_numbered(1, &block, b"").unwrap_err();
        assert!(matches!(err, ProtocolError::BlockTooLarge { max, .. } if max == SEND_BUFFER_SIZE));
    }

    #[test]
    fn test_strip_keyword() {
        assert_eq!(strip_keyword("OK T:20", "ok"), Some(" T:20"));
        assert_eq!(strip_keyword("o", "ok"), None);
        assert_eq!(strip_keyword("start", "rs"), None);
    }

    #[test]
    fn test_parse_resend_line() {
        assert_eq!(parse_resend_line(" 5"), Some(5));
        assert_eq!(parse_resend_line(": 12"), Some(12));
        assert_eq!(parse_resend_line(":N7 "), Some(7));
        assert_eq!(parse_resend_line(""), None);
        assert_eq!(parse_resend_line(" abc"), None);
        assert_eq!(parse_resend_line(" 5x"), None);
        assert_eq!(parse_resend_line(" 99999999999999999999999"), None);
    }

    #[test]
    fn test_factories_match_dialect() {
        for dialect in Dialect::ALL {
            assert_eq!(encoder_for(dialect, 1500).dialect(), dialect);
        }
        assert_eq!(grammar_for(Dialect::Simple).classify("ok"), Reply::Ack(vec![]));
    }
}
