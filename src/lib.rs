//! # rrlink
//!
//! Host-side driver for streaming G-code to RepRap-family printer firmware
//! over a serial link.
//!
//! ## Architecture
//!
//! rrlink is organized as a workspace with multiple crates:
//!
//! 1. **rrlink-core** - Errors, dialect and priority types, wire constants
//! 2. **rrlink-communication** - The protocol engine ([`Device`]), dialect
//!    framing and reply grammars, serial transport and port discovery
//! 3. **rrlink-settings** - Device configuration persisted as JSON or TOML
//! 4. **rrlink** - This facade, plus logging setup and build metadata
//!
//! ## Features
//!
//! - **Dialects**: plain G-code, 5D and Tonokip line numbering with checksums
//! - **Priority queues**: resends before operator commands before the job
//! - **Resend recovery**: bounded cache of framed lines, go-back-N on request
//! - **Non-blocking**: the caller drives I/O from its own readiness loop

pub use rrlink_communication::{communication, device, firmware};
pub use rrlink_core::{constants, types};

pub use rrlink_core::{
    ConnectionError, Dialect, Error, Priority, ProtocolError, ReplyError, ReplyKind, Result,
};

pub use rrlink_communication::{
    guess_device, list_ports, Device, DeviceConfig, DeviceListener, NoOpListener,
    SerialPortInfo, SerialTransport, Transport,
};

pub use rrlink_settings::{Config, DeviceSettings, SettingsError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize human readable logging to stdout.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`. Fails if a global
/// subscriber is already installed.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init()?;

    tracing::debug!("rrlink {} ({}) logging initialized", VERSION, BUILD_DATE);
    Ok(())
}

/// Initialize JSON logging to stdout, for hosts that collect structured logs.
pub fn init_json_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_writer(std::io::stdout))
        .try_init()?;
    Ok(())
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}
