//! 5D dialect
//!
//! Outbound: `N<line> <block>*<checksum>\r\n`. Feed moves (`G0`..`G3`) that
//! carry no `F` word get the configured default feedrate appended, since
//! the firmware refuses to guess one.
//!
//! Inbound:
//! - `ok [telemetry]`
//! - `rs <n>`, `resend <n>`, `resend: <n>`
//! - telemetry lines (`T:`, `B:`, `X:`, `Y:`, `Z:`, `E:`)
//! - `!!` faults
//! - `start` after a firmware reset

use super::telemetry::{parse_tokens, starts_with_telemetry};
use super::{frame_numbered, parse_resend_line, strip_keyword, BlockEncoder, Frame, Reply, ReplyGrammar};
use rrlink_core::constants::DEFAULT_FEEDRATE;
use rrlink_core::{Dialect, ProtocolError};
use std::borrow::Cow;

/// 5D dialect encoder and reply grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fived {
    feedrate: u32,
}

impl Fived {
    /// Create a 5D codec injecting `feedrate` into feed moves that lack one.
    pub fn new(feedrate: u32) -> Self {
        Self { feedrate }
    }
}

impl Default for Fived {
    fn default() -> Self {
        Self::new(DEFAULT_FEEDRATE)
    }
}

impl BlockEncoder for Fived {
    fn dialect(&self) -> Dialect {
        Dialect::Fived
    }

    fn encode(&self, line: u64, block: &[u8]) -> Result<Frame, ProtocolError> {
        let block: Cow<'_, [u8]> = if needs_feedrate(block) {
            let mut owned = block.to_vec();
            owned.extend_from_slice(format!(" F{}", self.feedrate).as_bytes());
            Cow::Owned(owned)
        } else {
            Cow::Borrowed(block)
        };
        frame_numbered(line, &block, b"")
    }
}

impl ReplyGrammar for Fived {
    fn classify(&self, line: &str) -> Reply {
        let line = line.trim();
        if let Some(rest) = strip_keyword(line, "ok") {
            return Reply::Ack(parse_tokens(rest));
        }
        if let Some(rest) = strip_keyword(line, "resend").or_else(|| resend_short(line)) {
            return match parse_resend_line(rest) {
                Some(n) => Reply::Resend(n),
                None => Reply::MalformedResend,
            };
        }
        if starts_with_telemetry(line) {
            return Reply::Telemetry(parse_tokens(line));
        }
        if line.starts_with("!!") {
            return Reply::Fault;
        }
        if strip_keyword(line, "start").is_some() {
            return Reply::Start;
        }
        Reply::Unknown
    }
}

/// `rs` only counts as a keyword when it is not the start of a longer word.
fn resend_short(line: &str) -> Option<&str> {
    let rest = strip_keyword(line, "rs")?;
    match rest.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => None,
        _ => Some(rest),
    }
}

/// Whether `block` is a feed move with no `F` word.
pub fn needs_feedrate(block: &[u8]) -> bool {
    let mut words = Words::new(block);
    let is_feed_move = matches!(words.next(), Some((b'G', value)) if is_feed_code(value));
    is_feed_move && !words.any(|(letter, _)| letter == b'F')
}

fn is_feed_code(value: &[u8]) -> bool {
    !value.is_empty()
        && value.iter().all(u8::is_ascii_digit)
        && value.iter().fold(0u32, |acc, d| acc.saturating_mul(10).saturating_add(u32::from(d - b'0'))) <= 3
}

/// Iterator over the `(letter, value)` words of a G-code block, skipping
/// `( ... )` comments.
struct Words<'a> {
    rest: &'a [u8],
}

impl<'a> Words<'a> {
    fn new(block: &'a [u8]) -> Self {
        Self { rest: block }
    }
}

impl<'a> Iterator for Words<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest: &'a [u8] = self.rest;
            let start = rest.iter().position(|b| !b.is_ascii_whitespace())?;
            let rest = &rest[start..];
            match rest[0] {
                b'(' => {
                    let close = rest.iter().position(|&b| b == b')');
                    self.rest = close.map_or(&[][..], |i| &rest[i + 1..]);
                }
                b';' => return None,
                letter => {
                    let body = &rest[1..];
                    let len = body
                        .iter()
                        .position(|b| !(b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+')))
                        .unwrap_or(body.len());
                    self.rest = &body[len..];
                    return Some((letter.to_ascii_uppercase(), &body[..len]));
                }
            }
        }
    }
}
