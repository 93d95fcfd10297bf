//! Tonokip dialect
//!
//! Numbered and checksummed like 5D, but the firmware expects a space
//! before the `*` marker and never needs an injected feedrate.
//! Replies use `Resend:` for retransmission requests and `Error:` or `!!`
//! for faults; temperature reports start with `T:`.

use super::telemetry::parse_tokens;
use super::{frame_numbered, parse_resend_line, strip_keyword, BlockEncoder, Frame, Reply, ReplyGrammar};
use rrlink_core::{Dialect, ProtocolError};

/// Tonokip dialect encoder and reply grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tonokip;

impl BlockEncoder for Tonokip {
    fn dialect(&self) -> Dialect {
        Dialect::Tonokip
    }

    fn encode(&self, line: u64, block: &[u8]) -> Result<Frame, ProtocolError> {
        frame_numbered(line, block, b" ")
    }
}

impl ReplyGrammar for Tonokip {
    fn classify(&self, line: &str) -> Reply {
        let line = line.trim();
        if let Some(rest) = strip_keyword(line, "ok") {
            Reply::Ack(parse_tokens(rest))
        } else if let Some(rest) = strip_keyword(line, "resend:") {
            match parse_resend_line(rest) {
                Some(n) => Reply::Resend(n),
                None => Reply::MalformedResend,
            }
        } else if strip_keyword(line, "t:").is_some() {
            Reply::Telemetry(parse_tokens(line))
        } else if line.starts_with("!!") || strip_keyword(line, "error:").is_some() {
            Reply::Fault
        } else if strip_keyword(line, "start").is_some() {
            Reply::Start
        } else {
            Reply::Unknown
        }
    }
}
