//! Wire constants shared by the send and receive paths.

/// Terminator appended to every outbound block.
pub const BLOCK_TERMINATOR: &[u8] = b"\r\n";

/// Size of a firmware line buffer. Framed blocks, minus the terminator, must fit.
pub const GCODE_BLOCKSIZE: usize = 256;

/// Largest framed block (including the terminator) the send path will hold.
pub const SEND_BUFFER_SIZE: usize = GCODE_BLOCKSIZE + BLOCK_TERMINATOR.len();

/// Largest raw block accepted by `enqueue`.
pub const MAX_BLOCK_LEN: usize = GCODE_BLOCKSIZE - BLOCK_TERMINATOR.len();

/// Largest reply line the receive path will accumulate before giving up on it.
pub const RECV_BUFFER_SIZE: usize = 256;

/// Line number given to the first numbered block after `open` or `reset`.
pub const FIRST_LINE_NUMBER: u64 = 1;

/// Feedrate injected into feed moves that lack one, for dialects that require it.
pub const DEFAULT_FEEDRATE: u32 = 1500;

/// Default capacity of the resend cache, in lines.
pub const DEFAULT_RESEND_CACHE_SIZE: usize = 64;

/// Default advisory queue depth used by `write_more`.
pub const DEFAULT_COMMAND_QUEUE_SIZE: usize = 16;

/// Default serial speed.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
