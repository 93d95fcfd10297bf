//! rrlink Settings Crate
//!
//! Loads, validates and saves the device configuration used to build a
//! [`rrlink_communication::Device`].

pub mod config;
pub mod error;

pub use config::{Config, DeviceSettings, AUTO_PORT};
pub use error::{SettingsError, SettingsResult};
