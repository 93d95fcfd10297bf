//! The protocol engine
//!
//! A [`Device`] owns one connection to printer firmware. It queues blocks
//! by priority, frames them for the configured dialect, keeps numbered
//! lines for resend requests and interprets replies. It never blocks
//! (except in [`Device::flush`]) and never spawns threads: the caller runs a
//! readiness loop and calls [`Device::handle_readable`] and
//! [`Device::handle_writable`] when the transport is ready.
//!
//! ```rust,ignore
//! let mut dev = Device::create(Dialect::Fived, Box::new(listener), 64);
//! dev.open("/dev/ttyUSB0", 115_200)?;
//! dev.enqueue(Priority::Normal, job_line, b"G1 X10 Y10")?;
//! loop {
//!     if dev.want_writable() {
//!         dev.handle_writable()?;
//!     }
//!     dev.handle_readable()?;
//! }
//! ```

pub mod config;
pub mod listener;
pub mod reply_parser;
pub mod resend_cache;
pub mod scheduler;

pub use config::DeviceConfig;
pub use listener::{DeviceListener, NoOpListener};
pub use reply_parser::{ParsedLine, ReplyParser};
pub use resend_cache::{CachedBlock, ResendCache};
pub use scheduler::{InFlight, Payload, QueueEntry, Scheduler};

use crate::communication::{SerialTransport, Transport};
use crate::firmware::{encoder_for, grammar_for, BlockEncoder, Reply, TelemetryToken};
use rrlink_core::constants::{MAX_BLOCK_LEN, RECV_BUFFER_SIZE};
use rrlink_core::{ConnectionError, Dialect, Priority, ProtocolError, ReplyError, Result};
use std::io;

/// Block sent to resynchronise firmware line numbering after a restart.
const LINE_RESET_BLOCK: &[u8] = b"M110";

/// One connection to printer firmware.
///
/// `T` is the caller's per-block tag, handed back through
/// [`DeviceListener::on_block_sent`] once the block is acknowledged.
pub struct Device<T: Clone> {
    config: DeviceConfig,
    encoder: Box<dyn BlockEncoder>,
    parser: ReplyParser,
    listener: Box<dyn DeviceListener<T>>,
    transport: Option<Box<dyn Transport>>,
    scheduler: Scheduler<T>,
    cache: ResendCache<T>,
    want_writable: bool,
}

impl<T: Clone> Device<T> {
    /// Create a disconnected device. Performs no I/O.
    pub fn create(
        dialect: Dialect,
        listener: Box<dyn DeviceListener<T>>,
        resend_cache_size: usize,
    ) -> Self {
        Self::with_config(DeviceConfig::new(dialect, resend_cache_size), listener)
    }

    /// Create a disconnected device from a full configuration.
    pub fn with_config(config: DeviceConfig, listener: Box<dyn DeviceListener<T>>) -> Self {
        tracing::debug!(
            "Creating {} device with a {} line resend cache",
            config.dialect,
            config.resend_cache_size
        );
        Self {
            encoder: encoder_for(config.dialect, config.default_feedrate),
            parser: ReplyParser::new(grammar_for(config.dialect)),
            listener,
            transport: None,
            scheduler: Scheduler::new(),
            cache: ResendCache::new(config.resend_cache_size),
            want_writable: false,
            config,
        }
    }

    /// Open the serial port `port` at `baud` and bind it.
    pub fn open(&mut self, port: &str, baud: u32) -> Result<()> {
        let transport = SerialTransport::open(port, baud)?;
        self.open_with(Box::new(transport));
        Ok(())
    }

    /// Bind an already open transport.
    ///
    /// Any previous transport is closed. Queues, cache, partial buffers and
    /// the line counter start afresh.
    pub fn open_with(&mut self, transport: Box<dyn Transport>) {
        self.close_transport();
        self.clear_state();
        tracing::info!("{} device bound to {}", self.config.dialect, transport.name());
        self.transport = Some(transport);
        self.refresh_writable();
    }

    /// Release the transport, discarding queued and in-flight blocks.
    ///
    /// Discarded blocks never reach the send callback. The device may be
    /// opened again.
    pub fn close(&mut self) -> Result<()> {
        let mut transport = self.transport.take().ok_or(ConnectionError::NotConnected)?;
        self.clear_state();
        self.refresh_writable();
        tracing::info!("Closing {}", transport.name());
        transport.close()?;
        Ok(())
    }

    /// Clear the line counter, queues, resend cache and partial buffers.
    ///
    /// The transport stays bound.
    pub fn reset(&mut self) {
        tracing::debug!("Resetting device state");
        self.clear_state();
        self.refresh_writable();
    }

    /// Resynchronise numbering with firmware that has just restarted.
    ///
    /// Pending resends and the cache are dropped, the in-flight block is
    /// released and `M110` is queued at high priority as line 0.
    pub fn reset_line_number(&mut self) {
        tracing::info!("Resetting firmware line numbering");
        self.scheduler.clear_queue(Priority::Resend);
        self.cache.clear();
        self.scheduler.release_in_flight();
        self.scheduler.restart_numbering(0);
        self.scheduler
            .push(Priority::High, None, Payload::Raw(LINE_RESET_BLOCK.to_vec()));
        self.refresh_writable();
    }

    /// Reset the printer's controller by pulsing DTR high then low.
    ///
    /// Queued blocks are kept. The firmware announces itself with `start`
    /// once it is back, which resynchronises numbering on numbered dialects.
    pub fn reset_device(&mut self) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(ConnectionError::NotConnected)?;
        tracing::info!("Pulsing DTR on {}", transport.name());
        transport.set_dtr(true)?;
        transport.set_dtr(false)?;
        Ok(())
    }

    /// Queue `block` for transmission.
    ///
    /// Text after `;` and trailing whitespace are stripped first; a block
    /// left empty is dropped without error.
    pub fn enqueue(&mut self, priority: Priority, tag: T, block: &[u8]) -> Result<()> {
        let block = strip_comment(block);
        if block.is_empty() {
            tracing::trace!("Dropping empty block");
            return Ok(());
        }
        if block.len() > MAX_BLOCK_LEN {
            return Err(ProtocolError::BlockTooLarge {
                len: block.len(),
                max: MAX_BLOCK_LEN,
            }
            .into());
        }

        tracing::debug!(
            "Queued at {} priority: {}",
            priority,
            String::from_utf8_lossy(block)
        );
        self.scheduler
            .push(priority, Some(tag), Payload::Raw(block.to_vec()));
        self.refresh_writable();
        Ok(())
    }

    /// Stop or resume dispatch from one priority queue.
    pub fn set_paused(&mut self, priority: Priority, paused: bool) {
        tracing::debug!(
            "{} {} queue",
            if paused { "Pausing" } else { "Resuming" },
            priority
        );
        self.scheduler.set_paused(priority, paused);
        self.refresh_writable();
    }

    /// Read what the transport has and act on every completed reply line.
    ///
    /// Returns the number of bytes read; `Ok(0)` when nothing was available.
    /// Problems with individual replies go to the error callback; only
    /// transport failures are returned.
    pub fn handle_readable(&mut self) -> Result<usize> {
        let transport = self.transport.as_mut().ok_or(ConnectionError::NotConnected)?;
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        let n = loop {
            match transport.read(&mut buf) {
                Ok(0) => {
                    tracing::warn!("{} reached end of stream", transport.name());
                    return Err(ConnectionError::ConnectionLost.into());
                }
                Ok(n) => break n,
                Err(e) if is_would_block(&e) => return Ok(0),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!("Read from {} failed: {}", transport.name(), e);
                    return Err(ConnectionError::ReadFailed {
                        reason: e.to_string(),
                    }
                    .into());
                }
            }
        };

        tracing::trace!("<< {:?}", String::from_utf8_lossy(&buf[..n]));
        for line in self.parser.feed(&buf[..n]) {
            match line {
                ParsedLine::Line { text, reply } => self.handle_reply(&text, reply),
                ParsedLine::Overflow(text) => {
                    tracing::warn!("Reply exceeded {} bytes, discarding", RECV_BUFFER_SIZE);
                    self.listener.on_line_received(&text);
                    self.listener.on_error(ReplyError::UnknownReply, &text);
                }
            }
        }

        self.refresh_writable();
        Ok(n)
    }

    /// Write as much of the current block as the transport accepts.
    ///
    /// Starts the next queued block when nothing is in flight. A no-op
    /// returning `Ok(0)` unless want-writable was last signalled `true`.
    pub fn handle_writable(&mut self) -> Result<usize> {
        if !self.want_writable {
            return Ok(0);
        }
        if self.transport.is_none() {
            return Err(ConnectionError::NotConnected.into());
        }

        let result = self.dispatch().and_then(|()| self.write_in_flight());
        self.refresh_writable();
        result
    }

    /// Block until every ready block has been written and acknowledged.
    ///
    /// Blocks in paused queues are left alone. Returns the first transport
    /// error encountered.
    pub fn flush(&mut self) -> Result<()> {
        while self.scheduler.in_flight().is_some() || self.scheduler.has_ready() {
            if self.transport.is_none() {
                return Err(ConnectionError::NotConnected.into());
            }
            self.handle_writable()?;
            if self.scheduler.in_flight().is_some_and(InFlight::is_written)
                && self.handle_readable()? == 0
            {
                std::thread::yield_now();
            }
        }
        Ok(())
    }

    /// Dialect spoken by this device
    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Configuration the device was built with
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Most recently dispatched line number, 0 before the first
    pub fn line_number(&self) -> u64 {
        self.scheduler.next_line().saturating_sub(1)
    }

    /// Check if any block is queued or in flight
    pub fn buffered(&self) -> bool {
        self.scheduler.in_flight().is_some() || self.scheduler.queued_len() > 0
    }

    /// Blocks waiting in the queues, not counting the in-flight one
    pub fn buffered_lines(&self) -> usize {
        self.scheduler.queued_len()
    }

    /// Check if the caller should feed more blocks
    pub fn write_more(&self) -> bool {
        self.buffered_lines() < self.config.command_queue_size
    }

    /// Check if a transport is bound
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Name of the bound transport
    pub fn port_name(&self) -> Option<String> {
        self.transport.as_ref().map(|t| t.name())
    }

    /// Raw descriptor of the bound transport, for readiness loops
    #[cfg(unix)]
    pub fn fd(&self) -> Option<std::os::unix::io::RawFd> {
        self.transport.as_ref().and_then(|t| t.as_raw_fd())
    }

    /// Framed bytes of the in-flight block
    pub fn in_flight_bytes(&self) -> Option<&[u8]> {
        self.scheduler.in_flight().map(|f| f.bytes.as_slice())
    }

    /// Framed bytes cached for `line`
    pub fn cached_line(&self, line: u64) -> Option<&[u8]> {
        self.cache.get(line).map(|e| e.bytes.as_slice())
    }

    /// Whether want-writable was last signalled `true`
    pub fn want_writable(&self) -> bool {
        self.want_writable
    }

    /// Blocks waiting in one priority queue
    pub fn queued(&self, priority: Priority) -> usize {
        self.scheduler.queue_len(priority)
    }

    fn clear_state(&mut self) {
        self.scheduler.clear();
        self.cache.clear();
        self.parser.reset();
    }

    fn close_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                tracing::warn!("Error closing {}: {}", transport.name(), e);
            }
        }
    }

    fn refresh_writable(&mut self) {
        let wanted = self.transport.is_some()
            && match self.scheduler.in_flight() {
                Some(flight) => !flight.is_written(),
                None => self.scheduler.has_ready(),
            };
        if wanted != self.want_writable {
            self.want_writable = wanted;
            self.listener.on_want_writable(wanted);
        }
    }

    /// Move the next ready entry into the in-flight slot, framing and caching it.
    fn dispatch(&mut self) -> Result<()> {
        if self.scheduler.in_flight().is_some() {
            return Ok(());
        }
        let Some(entry) = self.scheduler.pop_ready() else {
            return Ok(());
        };

        let (line, bytes) = match entry.payload {
            Payload::Framed { line, bytes } => {
                tracing::debug!("Resending line {}", line);
                (Some(line), bytes)
            }
            Payload::Raw(block) => {
                let frame = self
                    .encoder
                    .encode(self.scheduler.next_line(), &block)
                    .inspect_err(|e| tracing::warn!("Dropping block: {}", e))?;
                if let Some(line) = frame.line {
                    self.scheduler.commit_line(line);
                    self.cache.put(line, frame.bytes.clone(), entry.tag.clone());
                }
                (frame.line, frame.bytes)
            }
        };

        tracing::debug!(">> {}", String::from_utf8_lossy(&bytes).trim_end());
        self.scheduler.start(InFlight::new(entry.tag, bytes, line));
        Ok(())
    }

    fn write_in_flight(&mut self) -> Result<usize> {
        let (Some(transport), Some(flight)) =
            (self.transport.as_mut(), self.scheduler.in_flight_mut())
        else {
            return Ok(0);
        };

        let mut total = 0;
        while !flight.is_written() {
            match transport.write(flight.remaining()) {
                Ok(0) => break,
                Ok(n) => {
                    flight.written += n;
                    total += n;
                }
                Err(e) if is_would_block(&e) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!("Write to {} failed: {}", transport.name(), e);
                    return Err(ConnectionError::WriteFailed {
                        reason: e.to_string(),
                    }
                    .into());
                }
            }
        }

        if flight.is_written() {
            tracing::trace!("Block fully written ({} bytes)", flight.bytes.len());
            if flight.released {
                self.scheduler.take_in_flight();
            }
        }
        Ok(total)
    }

    fn handle_reply(&mut self, text: &str, reply: Reply) {
        self.listener.on_line_received(text);
        match reply {
            Reply::Ack(tokens) => {
                self.complete_in_flight();
                self.report_telemetry(tokens);
            }
            Reply::Resend(line) => self.request_resend(line, text),
            Reply::MalformedResend => {
                tracing::warn!("Malformed resend request: {}", text);
                self.listener
                    .on_error(ReplyError::MalformedResendRequest, text);
            }
            Reply::Telemetry(tokens) => self.report_telemetry(tokens),
            Reply::Fault => {
                tracing::warn!("Firmware fault: {}", text);
                self.listener.on_error(ReplyError::HardwareFault, text);
            }
            Reply::Start => {
                tracing::info!("Firmware restarted");
                if self.config.dialect.is_numbered() {
                    self.reset_line_number();
                }
            }
            Reply::Unknown => {
                tracing::warn!("Unknown reply: {}", text);
                self.listener.on_error(ReplyError::UnknownReply, text);
            }
        }
    }

    fn report_telemetry(&mut self, tokens: Vec<TelemetryToken>) {
        for token in tokens {
            match token {
                TelemetryToken::Value(kind, value) => self.listener.on_reply(kind, value),
                TelemetryToken::Malformed(text) => {
                    tracing::warn!("Malformed telemetry token: {}", text);
                    self.listener.on_error(ReplyError::UnknownReply, &text);
                }
            }
        }
    }

    fn complete_in_flight(&mut self) {
        match self.scheduler.in_flight() {
            None => {
                tracing::debug!("Acknowledgement with nothing in flight");
                return;
            }
            Some(flight) if flight.released || !flight.is_written() => {
                tracing::debug!("Acknowledgement for a block not yet fully sent, ignoring");
                return;
            }
            Some(_) => {}
        }
        let Some(flight) = self.scheduler.take_in_flight() else {
            return;
        };

        let first_ack = match flight.line.and_then(|line| self.cache.get_mut(line)) {
            Some(entry) => !std::mem::replace(&mut entry.acknowledged, true),
            None => true,
        };

        match flight.line {
            Some(line) => tracing::debug!("Line {} acknowledged", line),
            None => tracing::debug!("Block acknowledged"),
        }

        if let (true, Some(tag)) = (first_ack, flight.tag) {
            self.listener.on_block_sent(tag, &flight.bytes);
        }
    }

    /// Go back to `line` and requeue everything dispatched since.
    fn request_resend(&mut self, line: u64, text: &str) {
        let active = self.scheduler.in_flight().is_some()
            || self.scheduler.queue_len(Priority::Resend) > 0;
        let last = match self.scheduler.last_line() {
            Some(last) if active && line <= last => last,
            _ => {
                tracing::warn!("Resend requested for unsent line {}", line);
                self.listener.on_error(ReplyError::UnsentResend, text);
                return;
            }
        };

        if self.cache.get(line).is_none() {
            tracing::warn!("Resend requested for uncached line {}", line);
            self.listener.on_error(ReplyError::UncachedResend, text);
            return;
        }

        tracing::debug!("Going back to line {} (last sent {})", line, last);
        self.scheduler.clear_queue(Priority::Resend);
        for n in line..=last {
            // Lines evicted since the requested one was cached cannot be replayed.
            let Some(entry) = self.cache.get(n) else {
                tracing::warn!("Line {} evicted before it could be resent", n);
                break;
            };
            self.scheduler.push(
                Priority::Resend,
                entry.tag.clone(),
                Payload::Framed {
                    line: n,
                    bytes: entry.bytes.clone(),
                },
            );
        }
        self.scheduler.release_in_flight();
    }
}

impl<T: Clone> Drop for Device<T> {
    fn drop(&mut self) {
        self.close_transport();
    }
}

impl<T: Clone> std::fmt::Debug for Device<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("config", &self.config)
            .field("port", &self.port_name())
            .field("next_line", &self.scheduler.next_line())
            .field("queued", &self.scheduler.queued_len())
            .field("in_flight", &self.scheduler.in_flight().is_some())
            .field("want_writable", &self.want_writable)
            .finish()
    }
}

fn is_would_block(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Strip a `;` comment and trailing whitespace.
fn strip_comment(block: &[u8]) -> &[u8] {
    let end = block.iter().position(|&b| b == b';').unwrap_or(block.len());
    block[..end].trim_ascii_end()
}
