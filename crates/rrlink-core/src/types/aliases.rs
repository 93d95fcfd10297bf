//! Type aliases for sharing driver state across threads.
//!
//! A device is single-threaded: every operation takes `&mut self`. Callers
//! that feed it from one thread and poll it from another wrap it (or the
//! state their listener records into) in one of these aliases.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rrlink_core::types::*;
//!
//! let sent: ThreadSafeVec<String> = thread_safe_vec();
//! sent.lock().push("G28".to_string());
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

/// Thread-safe shared mutable state.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// Thread-safe shared vector.
pub type ThreadSafeVec<T> = Arc<Mutex<Vec<T>>>;

/// Create a new `ThreadSafe<T>` from a value.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}

/// Create a new empty `ThreadSafeVec<T>`.
#[inline]
pub fn thread_safe_vec<T>() -> ThreadSafeVec<T> {
    Arc::new(Mutex::new(Vec::new()))
}
