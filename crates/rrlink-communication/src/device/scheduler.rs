//! Outbound scheduler
//!
//! Three FIFO queues, one per [`Priority`], plus the single in-flight slot.
//! Dispatch always drains `Resend` before `High` before `Normal`. The
//! scheduler also owns the line counter: the device peeks
//! [`Scheduler::next_line`] when framing and only calls
//! [`Scheduler::commit_line`] once framing has succeeded.

use rrlink_core::constants::FIRST_LINE_NUMBER;
use rrlink_core::{Priority, PRIORITY_COUNT};
use std::collections::VecDeque;

/// What a queue entry carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Block bytes still to be framed
    Raw(Vec<u8>),
    /// Already framed bytes replayed from the resend cache
    Framed {
        /// Line number the bytes were framed with
        line: u64,
        /// Exact framed bytes
        bytes: Vec<u8>,
    },
}

/// A queued block.
#[derive(Debug, Clone)]
pub struct QueueEntry<T> {
    /// Caller tag, `None` for engine-generated blocks
    pub tag: Option<T>,
    /// Block bytes
    pub payload: Payload,
}

/// The block currently being written or awaiting acknowledgement.
#[derive(Debug, Clone)]
pub struct InFlight<T> {
    /// Caller tag, `None` for engine-generated blocks
    pub tag: Option<T>,
    /// Exact framed bytes
    pub bytes: Vec<u8>,
    /// Line number, for numbered dialects
    pub line: Option<u64>,
    /// Bytes already accepted by the transport
    pub written: usize,
    /// Superseded by a resend or restart: finish writing, then drop
    pub released: bool,
}

impl<T> InFlight<T> {
    /// Create an in-flight block with nothing written yet.
    pub fn new(tag: Option<T>, bytes: Vec<u8>, line: Option<u64>) -> Self {
        Self {
            tag,
            bytes,
            line,
            written: 0,
            released: false,
        }
    }

    /// Bytes not yet accepted by the transport
    pub fn remaining(&self) -> &[u8] {
        &self.bytes[self.written..]
    }

    /// Check if every byte has been written
    pub fn is_written(&self) -> bool {
        self.written >= self.bytes.len()
    }
}

/// Priority queues, in-flight slot and line counter.
#[derive(Debug)]
pub struct Scheduler<T> {
    queues: [VecDeque<QueueEntry<T>>; PRIORITY_COUNT],
    paused: [bool; PRIORITY_COUNT],
    in_flight: Option<InFlight<T>>,
    next_line: u64,
    last_line: Option<u64>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler whose first line is [`FIRST_LINE_NUMBER`].
    pub fn new() -> Self {
        Self {
            queues: std::array::from_fn(|_| VecDeque::new()),
            paused: [false; PRIORITY_COUNT],
            in_flight: None,
            next_line: FIRST_LINE_NUMBER,
            last_line: None,
        }
    }

    /// Append an entry to the tail of its priority queue.
    pub fn push(&mut self, priority: Priority, tag: Option<T>, payload: Payload) {
        self.queues[priority.index()].push_back(QueueEntry { tag, payload });
    }

    /// Pop the next entry to dispatch, honouring priority order and pauses.
    pub fn pop_ready(&mut self) -> Option<QueueEntry<T>> {
        Priority::DISPATCH_ORDER
            .iter()
            .filter(|p| !self.paused[p.index()])
            .find_map(|p| self.queues[p.index()].pop_front())
    }

    /// Check if an unpaused queue holds an entry
    pub fn has_ready(&self) -> bool {
        Priority::DISPATCH_ORDER
            .iter()
            .any(|p| !self.paused[p.index()] && !self.queues[p.index()].is_empty())
    }

    /// Entries waiting in all queues, paused or not
    pub fn queued_len(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Entries waiting in one queue
    pub fn queue_len(&self, priority: Priority) -> usize {
        self.queues[priority.index()].len()
    }

    /// Drop every entry of one queue.
    pub fn clear_queue(&mut self, priority: Priority) {
        self.queues[priority.index()].clear();
    }

    /// Stop or resume dispatch from one queue.
    pub fn set_paused(&mut self, priority: Priority, paused: bool) {
        self.paused[priority.index()] = paused;
    }

    /// Check if a queue is paused
    pub fn is_paused(&self, priority: Priority) -> bool {
        self.paused[priority.index()]
    }

    /// The in-flight block, if any
    pub fn in_flight(&self) -> Option<&InFlight<T>> {
        self.in_flight.as_ref()
    }

    /// Mutable access to the in-flight block
    pub fn in_flight_mut(&mut self) -> Option<&mut InFlight<T>> {
        self.in_flight.as_mut()
    }

    /// Occupy the in-flight slot.
    pub fn start(&mut self, flight: InFlight<T>) {
        debug_assert!(self.in_flight.is_none(), "in-flight slot already occupied");
        self.in_flight = Some(flight);
    }

    /// Empty the in-flight slot.
    pub fn take_in_flight(&mut self) -> Option<InFlight<T>> {
        self.in_flight.take()
    }

    /// Give up on the in-flight block without acknowledging it.
    ///
    /// A fully written block is dropped at once. A partially written one is
    /// marked released so its tail still goes out and the stream stays in
    /// sync; it is dropped when the write completes.
    pub fn release_in_flight(&mut self) {
        let Some(written) = self.in_flight.as_ref().map(InFlight::is_written) else {
            return;
        };
        if written {
            self.in_flight = None;
        } else if let Some(flight) = self.in_flight.as_mut() {
            flight.released = true;
        }
    }

    /// Line number the next framed block will get
    pub fn next_line(&self) -> u64 {
        self.next_line
    }

    /// Most recently dispatched line number
    pub fn last_line(&self) -> Option<u64> {
        self.last_line
    }

    /// Record that `line` has been framed and dispatched.
    pub fn commit_line(&mut self, line: u64) {
        self.last_line = Some(line);
        self.next_line = line + 1;
    }

    /// Restart numbering at `line`.
    pub fn restart_numbering(&mut self, line: u64) {
        self.next_line = line;
        self.last_line = None;
    }

    /// Drop all queued entries and the in-flight slot, and restart numbering.
    ///
    /// Pauses survive.
    pub fn clear(&mut self) {
        self.queues.iter_mut().for_each(VecDeque::clear);
        self.in_flight = None;
        self.restart_numbering(FIRST_LINE_NUMBER);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(s: &str) -> Payload {
        Payload::Raw(s.as_bytes().to_vec())
    }

    fn drain(scheduler: &mut Scheduler<u32>) -> Vec<u32> {
        std::iter::from_fn(|| scheduler.pop_ready())
            .filter_map(|e| e.tag)
            .collect()
    }

    #[test]
    fn test_priority_then_fifo() {
        let mut s = Scheduler::new();
        s.push(Priority::Normal, Some(1), raw("G1 X1"));
        s.push(Priority::High, Some(2), raw("M112"));
        s.push(Priority::Normal, Some(3), raw("G1 X2"));
        s.push(Priority::Resend, Some(4), raw("G1 X0"));
        s.push(Priority::High, Some(5), raw("M105"));
        assert_eq!(drain(&mut s), vec![4, 2, 5, 1, 3]);
        assert!(!s.has_ready());
    }

    #[test]
    fn test_paused_queue_is_skipped() {
        let mut s = Scheduler::new();
        s.push(Priority::Normal, Some(1), raw("G1 X1"));
        s.push(Priority::High, Some(2), raw("M105"));
        s.set_paused(Priority::High, true);
        assert!(s.is_paused(Priority::High));
        assert_eq!(drain(&mut s), vec![1]);
        assert!(!s.has_ready());
        assert_eq!(s.queued_len(), 1);

        s.set_paused(Priority::High, false);
        assert!(s.has_ready());
        assert_eq!(drain(&mut s), vec![2]);
    }

    #[test]
    fn test_line_counter() {
        let mut s: Scheduler<u32> = Scheduler::new();
        assert_eq!(s.next_line(), FIRST_LINE_NUMBER);
        assert_eq!(s.last_line(), None);
        s.commit_line(1);
        s.commit_line(2);
        assert_eq!(s.next_line(), 3);
        assert_eq!(s.last_line(), Some(2));

        s.restart_numbering(0);
        assert_eq!(s.next_line(), 0);
        assert_eq!(s.last_line(), None);
    }

    #[test]
    fn test_release_in_flight() {
        let mut s: Scheduler<u32> = Scheduler::new();
        s.start(InFlight::new(Some(1), b"N1 M105*38\r\n".to_vec(), Some(1)));
        s.in_flight_mut().unwrap().written = 4;
        s.release_in_flight();
        let flight = s.in_flight().unwrap();
        assert!(flight.released);
        assert_eq!(flight.remaining(), b"M105*38\r\n");

        s.in_flight_mut().unwrap().written = 12;
        s.release_in_flight();
        assert!(s.in_flight().is_none());
    }

    #[test]
    fn test_clear_keeps_pauses() {
        let mut s = Scheduler::new();
        s.set_paused(Priority::Normal, true);
        s.push(Priority::Normal, Some(1), raw("G1"));
        s.start(InFlight::new(Some(2), b"x".to_vec(), None));
        s.commit_line(9);
        s.clear();
        assert_eq!(s.queued_len(), 0);
        assert!(s.in_flight().is_none());
        assert_eq!(s.next_line(), FIRST_LINE_NUMBER);
        assert!(s.is_paused(Priority::Normal));
    }
}
