//! # rrlink Communication
//!
//! The host side of the RepRap serial protocol: a non-blocking engine that
//! streams G-code blocks to printer firmware, frames them per dialect,
//! recovers lost lines from a resend cache and interprets replies.
//!
//! Also provides the serial transport the engine binds to and port
//! discovery helpers.

pub mod communication;
pub mod device;
pub mod firmware;

pub use communication::{guess_device, list_ports, SerialPortInfo, SerialTransport, Transport};
pub use device::{Device, DeviceConfig, DeviceListener, NoOpListener};
pub use firmware::{checksum, encoder_for, grammar_for, BlockEncoder, Frame, Reply, ReplyGrammar, TelemetryToken};
