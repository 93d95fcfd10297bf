//! Construction parameters for a [`crate::Device`].

use rrlink_core::constants::{DEFAULT_COMMAND_QUEUE_SIZE, DEFAULT_FEEDRATE, DEFAULT_RESEND_CACHE_SIZE};
use rrlink_core::Dialect;
use serde::{Deserialize, Serialize};

/// Device configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Wire dialect spoken by the firmware
    pub dialect: Dialect,
    /// Lines kept for resend requests
    pub resend_cache_size: usize,
    /// Feedrate injected into feed moves that lack one (5D only)
    pub default_feedrate: u32,
    /// Queue depth below which `write_more` asks for more blocks
    pub command_queue_size: usize,
}

impl DeviceConfig {
    /// Configuration for `dialect` with a resend cache of `resend_cache_size` lines.
    pub fn new(dialect: Dialect, resend_cache_size: usize) -> Self {
        Self {
            dialect,
            resend_cache_size,
            ..Self::default()
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            resend_cache_size: DEFAULT_RESEND_CACHE_SIZE,
            default_feedrate: DEFAULT_FEEDRATE,
            command_queue_size: DEFAULT_COMMAND_QUEUE_SIZE,
        }
    }
}
