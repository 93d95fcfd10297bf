//! # rrlink Core
//!
//! Core types, errors, and wire constants shared by the rrlink crates.
//! Provides the dialect and priority vocabulary used by the protocol engine,
//! the error taxonomy, and the sharing aliases used by callers that need to
//! drive a device from more than one thread.

pub mod constants;
pub mod dialect;
pub mod error;
pub mod reply;
pub mod types;

pub use dialect::{Dialect, Priority, PRIORITY_COUNT};
pub use error::{ConnectionError, Error, ProtocolError, ReplyError, Result};
pub use reply::ReplyKind;

pub use types::{thread_safe, thread_safe_vec, ThreadSafe, ThreadSafeVec};
