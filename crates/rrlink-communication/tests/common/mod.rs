#![allow(dead_code)]

use rrlink_communication::{DeviceListener, Transport};
use rrlink_core::{thread_safe, thread_safe_vec, ReplyError, ReplyKind, ThreadSafe, ThreadSafeVec};
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

/// State shared between a test and its mock transport.
#[derive(Debug, Default)]
pub struct Wire {
    /// Bytes the firmware will send to the host
    pub incoming: VecDeque<u8>,
    /// Everything the host wrote
    pub written: Vec<u8>,
    /// Bytes accepted before writes start returning `WouldBlock`
    pub budget: Option<usize>,
    /// Return end of stream from reads
    pub eof: bool,
    /// Fail writes with a broken pipe
    pub broken: bool,
    /// Reply `ok` to every complete line written
    pub auto_ack: bool,
    pub closed: bool,
    /// Every DTR level set, in order
    pub dtr: Vec<bool>,
}

impl Wire {
    pub fn push_reply(&mut self, reply: &str) {
        self.incoming.extend(reply.as_bytes());
    }

    /// Written bytes split into CRLF terminated lines.
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.written)
            .split_inclusive("\r\n")
            .map(str::to_string)
            .collect()
    }

    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }
}

/// In-memory transport driven through a shared [`Wire`].
pub struct MockTransport {
    pub wire: ThreadSafe<Wire>,
}

impl MockTransport {
    pub fn new() -> (Self, ThreadSafe<Wire>) {
        let wire = thread_safe(Wire::default());
        (
            Self {
                wire: Arc::clone(&wire),
            },
            wire,
        )
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut wire = self.wire.lock();
        if wire.incoming.is_empty() {
            if wire.eof {
                return Ok(0);
            }
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = buf.len().min(wire.incoming.len());
        for (slot, b) in buf.iter_mut().zip(wire.incoming.drain(..n)) {
            *slot = b;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut wire = self.wire.lock();
        if wire.broken {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        let budget = wire.budget;
        let n = match budget {
            Some(0) => return Err(io::ErrorKind::WouldBlock.into()),
            Some(budget) => {
                let n = budget.min(data.len());
                wire.budget = Some(budget - n);
                n
            }
            None => data.len(),
        };
        wire.written.extend_from_slice(&data[..n]);
        if wire.auto_ack {
            let acks = data[..n].iter().filter(|&&b| b == b'\n').count();
            for _ in 0..acks {
                wire.push_reply("ok\r\n");
            }
        }
        Ok(n)
    }

    fn name(&self) -> String {
        "mock".to_string()
    }

    fn close(&mut self) -> io::Result<()> {
        self.wire.lock().closed = true;
        Ok(())
    }

    fn set_dtr(&mut self, level: bool) -> io::Result<()> {
        self.wire.lock().dtr.push(level);
        Ok(())
    }
}

/// Everything a listener was told, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Sent(u32, String),
    Line(String),
    Reply(ReplyKind, f32),
    Error(ReplyError, String),
    Writable(bool),
}

/// Listener recording every callback into a shared log.
pub struct RecordingListener {
    pub events: ThreadSafeVec<Event>,
}

impl RecordingListener {
    pub fn new() -> (Self, ThreadSafeVec<Event>) {
        let events = thread_safe_vec();
        (
            Self {
                events: Arc::clone(&events),
            },
            events,
        )
    }
}

impl DeviceListener<u32> for RecordingListener {
    fn on_block_sent(&mut self, tag: u32, block: &[u8]) {
        self.events
            .lock()
            .push(Event::Sent(tag, String::from_utf8_lossy(block).into_owned()));
    }

    fn on_line_received(&mut self, line: &str) {
        self.events.lock().push(Event::Line(line.to_string()));
    }

    fn on_reply(&mut self, kind: ReplyKind, value: f32) {
        self.events.lock().push(Event::Reply(kind, value));
    }

    fn on_error(&mut self, error: ReplyError, text: &str) {
        self.events.lock().push(Event::Error(error, text.to_string()));
    }

    fn on_want_writable(&mut self, wanted: bool) {
        self.events.lock().push(Event::Writable(wanted));
    }
}

pub fn sent(events: &[Event]) -> Vec<(u32, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Sent(tag, block) => Some((*tag, block.clone())),
            _ => None,
        })
        .collect()
}

pub fn errors(events: &[Event]) -> Vec<(ReplyError, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Error(kind, text) => Some((*kind, text.clone())),
            _ => None,
        })
        .collect()
}

/// `N<line> <body>*<checksum>\r\n` as the 5D encoder frames it.
pub fn fived_frame(line: u64, body: &str) -> String {
    let head = format!("N{} {}", line, body);
    let cs = head.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("{}*{}\r\n", head, cs)
}
