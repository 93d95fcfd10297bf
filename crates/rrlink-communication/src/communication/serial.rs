//! Serial port transport and port discovery
//!
//! Provides the serial collaborator the engine binds to in [`crate::Device::open`]:
//! - Port enumeration with a `/dev` scan fallback on Linux
//! - Guessing the most likely printer port
//! - Opening a port at a given speed with a short timeout so reads and
//!   writes never stall the caller's readiness loop

use super::Transport;
use rrlink_core::{ConnectionError, Result};
use serialport::SerialPort;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::time::Duration;

#[cfg(unix)]
type NativePort = serialport::TTYPort;
#[cfg(windows)]
type NativePort = serialport::COMPort;

/// Read/write timeout applied to opened ports.
const PORT_TIMEOUT: Duration = Duration::from_millis(10);

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            vid: None,
            pid: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set USB IDs
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }
}

impl From<&serialport::SerialPortInfo> for SerialPortInfo {
    fn from(port: &serialport::SerialPortInfo) -> Self {
        let info = SerialPortInfo::new(&port.port_name, port_description(port));
        match &port.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                let info = info.with_usb_ids(usb.vid, usb.pid);
                match &usb.manufacturer {
                    Some(mfg) => info.with_manufacturer(mfg),
                    None => info,
                }
            }
            _ => info,
        }
    }
}

/// List serial ports that look like printer controllers
///
/// Candidate patterns:
/// - Windows: COM* (COM1, COM3, ...)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
///
/// On Linux, device nodes the enumeration API missed are picked up from
/// `/dev`. The result is sorted so ACM devices come first, then USB
/// adapters, each in numeric order.
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        ConnectionError::EnumerationFailed {
            reason: e.to_string(),
        }
    })?;

    let mut found: HashMap<String, SerialPortInfo> = ports
        .iter()
        .filter(|port| is_candidate_port(&port.port_name))
        .map(|port| (port.port_name.clone(), SerialPortInfo::from(port)))
        .collect();

    #[cfg(target_os = "linux")]
    if let Ok(entries) = std::fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                let full = format!("/dev/{}", name);
                if is_candidate_port(&full) {
                    found
                        .entry(full.clone())
                        .or_insert_with(|| SerialPortInfo::new(full, "Serial Port"));
                }
            }
        }
    }

    let mut ports: Vec<SerialPortInfo> = found.into_values().collect();
    ports.sort_by_key(|p| port_sort_key(&p.port_name));
    tracing::debug!("Found {} candidate serial ports", ports.len());
    Ok(ports)
}

/// Best guess at the port a printer is attached to.
pub fn guess_device() -> Option<String> {
    list_ports()
        .ok()
        .and_then(|ports| ports.into_iter().next())
        .map(|p| p.port_name)
}

/// Check if a port name matches a printer controller pattern
pub(crate) fn is_candidate_port(port_name: &str) -> bool {
    if let Some(rest) = port_name.strip_prefix("COM") {
        return !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit());
    }

    port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/cu.usbserial-")
        || port_name.starts_with("/dev/cu.usbmodem")
}

/// Sort key: ttyACM* first, then ttyUSB*, numerically by suffix; others by name.
pub(crate) fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        return (0, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        return (1, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("COM") {
        return (2, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    (3, 0, basename.to_string())
}

fn port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb) => format!(
            "USB {} {}",
            usb.manufacturer.as_deref().unwrap_or("Device"),
            usb.product.as_deref().unwrap_or("Serial Port")
        ),
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Serial port transport backed by the `serialport` crate
pub struct SerialTransport {
    name: String,
    port: Option<NativePort>,
}

impl SerialTransport {
    /// Open `port` at `baud` (8N1, no flow control).
    ///
    /// Nonstandard speeds are passed straight through; the platform layer
    /// applies them with the custom-divisor call where the OS supports it.
    pub fn open(port: &str, baud: u32) -> Result<Self> {
        if baud == 0 {
            return Err(ConnectionError::UnsupportedBaudRate { baud }.into());
        }

        let native = serialport::new(port, baud)
            .timeout(PORT_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open_native()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", port, e);
                ConnectionError::FailedToOpen {
                    port: port.to_string(),
                    reason: e.to_string(),
                }
            })?;

        tracing::info!("Opened serial port {} at {} baud", port, baud);
        Ok(Self {
            name: port.to_string(),
            port: Some(native),
        })
    }

    fn port_mut(&mut self) -> io::Result<&mut NativePort> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port closed"))
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port_mut()?.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.port_mut()?.write(data)
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut port) = self.port.take() {
            port.flush()?;
            tracing::info!("Closed serial port {}", self.name);
        }
        Ok(())
    }

    fn set_dtr(&mut self, level: bool) -> io::Result<()> {
        self.port_mut()?
            .write_data_terminal_ready(level)
            .map_err(io::Error::from)
    }

    #[cfg(unix)]
    fn as_raw_fd(&self) -> Option<std::os::unix::io::RawFd> {
        use std::os::unix::io::AsRawFd;
        self.port.as_ref().map(|p| p.as_raw_fd())
    }
}
