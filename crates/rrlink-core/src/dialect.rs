//! Firmware dialects and outbound priority classes.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire-framing convention spoken by the firmware on the other end of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Plain G-code terminated by CRLF, acknowledged with `ok`
    Simple,
    /// Line numbers, checksums and a mandatory feedrate on feed moves
    #[default]
    Fived,
    /// Line numbers and checksums with Tonokip token syntax
    Tonokip,
}

impl Dialect {
    /// Every supported dialect.
    pub const ALL: [Dialect; 3] = [Dialect::Simple, Dialect::Fived, Dialect::Tonokip];

    /// Whether blocks in this dialect carry line numbers and checksums.
    pub fn is_numbered(&self) -> bool {
        !matches!(self, Self::Simple)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Fived => write!(f, "fived"),
            Self::Tonokip => write!(f, "tonokip"),
        }
    }
}

impl FromStr for Dialect {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "fived" | "5d" => Ok(Self::Fived),
            "tonokip" => Ok(Self::Tonokip),
            other => Err(ProtocolError::UnsupportedProto {
                dialect: other.to_string(),
            }),
        }
    }
}

/// Number of outbound priority classes.
pub const PRIORITY_COUNT: usize = 3;

/// Outbound priority class. Ordered ascending; `Resend` always drains first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Ordinary job traffic
    #[default]
    Normal = 0,
    /// Operator commands that jump ahead of the job
    High = 1,
    /// Retransmissions requested by the firmware
    Resend = 2,
}

impl Priority {
    /// Priorities in the order the scheduler drains them.
    pub const DISPATCH_ORDER: [Priority; PRIORITY_COUNT] =
        [Priority::Resend, Priority::High, Priority::Normal];

    /// Queue index for this priority.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
            Self::Resend => write!(f, "resend"),
        }
    }
}
