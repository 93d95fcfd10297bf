//! Simple dialect: bare G-code lines acknowledged with `ok`.

use super::telemetry::{parse_tokens, starts_with_telemetry};
use super::{check_frame_len, strip_keyword, BlockEncoder, Frame, Reply, ReplyGrammar};
use rrlink_core::constants::BLOCK_TERMINATOR;
use rrlink_core::{Dialect, ProtocolError};

/// Simple dialect encoder and reply grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simple;

impl BlockEncoder for Simple {
    fn dialect(&self) -> Dialect {
        Dialect::Simple
    }

    fn encode(&self, _line: u64, block: &[u8]) -> Result<Frame, ProtocolError> {
        let mut bytes = Vec::with_capacity(block.len() + BLOCK_TERMINATOR.len());
        bytes.extend_from_slice(block);
        bytes.extend_from_slice(BLOCK_TERMINATOR);
        check_frame_len(&bytes)?;
        Ok(Frame {
            bytes,
            line: None,
            checksum: None,
        })
    }
}

impl ReplyGrammar for Simple {
    fn classify(&self, line: &str) -> Reply {
        let line = line.trim();
        if let Some(rest) = strip_keyword(line, "ok") {
            Reply::Ack(parse_tokens(rest))
        } else if starts_with_telemetry(line) {
            Reply::Telemetry(parse_tokens(line))
        } else if line.starts_with("!!") {
            Reply::Fault
        } else if strip_keyword(line, "start").is_some() {
            Reply::Start
        } else {
            Reply::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::TelemetryToken;
    use rrlink_core::ReplyKind;

    #[test]
    fn test_encode_is_verbatim() {
        let frame = Simple.encode(42, b"G1 X10").unwrap();
        assert_eq!(frame.bytes, b"G1 X10\r\n");
        assert_eq!(frame.line, None);
        assert_eq!(frame.checksum, None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(Simple.classify("ok"), Reply::Ack(vec![]));
        assert_eq!(
            Simple.classify("ok T:20"),
            Reply::Ack(vec![TelemetryToken::Value(ReplyKind::NozzleTemp, 20.0)])
        );
        assert_eq!(Simple.classify("!! thermistor open"), Reply::Fault);
        assert_eq!(Simple.classify("rs 5"), Reply::Unknown);
        assert_eq!(Simple.classify("echo:unknown command"), Reply::Unknown);
        assert_eq!(Simple.classify("start"), Reply::Start);
    }
}
