//! Telemetry values reported by firmware.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of value carried by a known telemetry token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplyKind {
    /// Hotend temperature (`T:`)
    NozzleTemp,
    /// Heated bed temperature (`B:`)
    BedTemp,
    /// X position (`X:`)
    XPos,
    /// Y position (`Y:`)
    YPos,
    /// Z position (`Z:`)
    ZPos,
    /// Extruder position (`E:`)
    EPos,
}

impl ReplyKind {
    /// Map a token key such as `T` or `x` to its reply kind.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "T" | "t" => Some(Self::NozzleTemp),
            "B" | "b" => Some(Self::BedTemp),
            "X" | "x" => Some(Self::XPos),
            "Y" | "y" => Some(Self::YPos),
            "Z" | "z" => Some(Self::ZPos),
            "E" | "e" => Some(Self::EPos),
            _ => None,
        }
    }
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NozzleTemp => write!(f, "nozzle temperature"),
            Self::BedTemp => write!(f, "bed temperature"),
            Self::XPos => write!(f, "X position"),
            Self::YPos => write!(f, "Y position"),
            Self::ZPos => write!(f, "Z position"),
            Self::EPos => write!(f, "E position"),
        }
    }
}
