//! Incremental reply line splitter.
//!
//! Bytes arrive in arbitrary chunks. Any run of `\r`/`\n` ends a line,
//! empty lines are skipped and NUL bytes (line noise after a reset) are
//! dropped. Each complete line is classified by the dialect's grammar.
//!
//! A line that outgrows [`RECV_BUFFER_SIZE`] is reported once as
//! [`ParsedLine::Overflow`] with the partial text; the rest of it is
//! discarded up to the next terminator.

use crate::firmware::{Reply, ReplyGrammar};
use rrlink_core::constants::RECV_BUFFER_SIZE;

/// Outcome of one incoming line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// A complete line and its classification
    Line {
        /// Line text, terminator removed
        text: String,
        /// Classification by the dialect grammar
        reply: Reply,
    },
    /// The line did not fit the receive buffer
    Overflow(String),
}

/// Line-buffering reply parser.
pub struct ReplyParser {
    grammar: Box<dyn ReplyGrammar>,
    buf: Vec<u8>,
    discarding: bool,
}

impl ReplyParser {
    /// Create a parser classifying lines with `grammar`.
    pub fn new(grammar: Box<dyn ReplyGrammar>) -> Self {
        Self {
            grammar,
            buf: Vec::with_capacity(RECV_BUFFER_SIZE),
            discarding: false,
        }
    }

    /// Bytes of the line accumulated so far
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Forget any partial line.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.discarding = false;
    }

    /// Consume `bytes`, returning every line they complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ParsedLine> {
        let mut lines = Vec::new();

        for &b in bytes {
            match b {
                b'\r' | b'\n' => {
                    if self.discarding {
                        self.discarding = false;
                    } else if !self.buf.is_empty() {
                        let text = String::from_utf8_lossy(&self.buf).into_owned();
                        self.buf.clear();
                        let reply = self.grammar.classify(&text);
                        lines.push(ParsedLine::Line { text, reply });
                    }
                }
                0 => {}
                _ if self.discarding => {}
                _ if self.buf.len() >= RECV_BUFFER_SIZE => {
                    let text = String::from_utf8_lossy(&self.buf).into_owned();
                    self.buf.clear();
                    self.discarding = true;
                    lines.push(ParsedLine::Overflow(text));
                }
                _ => self.buf.push(b),
            }
        }

        lines
    }
}

impl std::fmt::Debug for ReplyParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyParser")
            .field("pending", &self.buf.len())
            .field("discarding", &self.discarding)
            .finish()
    }
}
