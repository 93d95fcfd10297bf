//! Device event callbacks.

use rrlink_core::{ReplyError, ReplyKind};

/// Receiver for everything a [`crate::Device`] reports asynchronously.
///
/// All five callbacks are required. They run synchronously inside the
/// device call that triggered them, on the caller's thread.
pub trait DeviceListener<T>: Send {
    /// A block was acknowledged by the firmware.
    ///
    /// Fires exactly once per enqueued block, with the caller's tag and the
    /// exact framed bytes that went out.
    fn on_block_sent(&mut self, tag: T, block: &[u8]);

    /// A complete reply line arrived. Fires before any classification callback.
    fn on_line_received(&mut self, line: &str);

    /// The firmware reported a known telemetry value.
    fn on_reply(&mut self, kind: ReplyKind, value: f32);

    /// A reply could not be acted on. `text` is the offending line or token.
    fn on_error(&mut self, error: ReplyError, text: &str);

    /// The device started or stopped needing `handle_writable` calls.
    fn on_want_writable(&mut self, wanted: bool);
}

/// Listener that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpListener;

impl<T> DeviceListener<T> for NoOpListener {
    fn on_block_sent(&mut self, _tag: T, _block: &[u8]) {}
    fn on_line_received(&mut self, _line: &str) {}
    fn on_reply(&mut self, _kind: ReplyKind, _value: f32) {}
    fn on_error(&mut self, _error: ReplyError, _text: &str) {}
    fn on_want_writable(&mut self, _wanted: bool) {}
}
