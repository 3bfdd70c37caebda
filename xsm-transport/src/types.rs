//! Common types for the transport layer

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which physical bus a command travels over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusKind {
    /// Indexed firmware method call (WMI `WMBB`)
    Wmi,
    /// Raw 8-bit embedded controller register access
    Ec,
    /// In-memory recording bus used by tests and dry runs
    Mock,
}

/// Target of a single transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Firmware method id
    Method(u8),
    /// EC register address
    Register(u8),
}

impl Opcode {
    pub fn bus(&self) -> BusKind {
        match self {
            Opcode::Method(_) => BusKind::Wmi,
            Opcode::Register(_) => BusKind::Ec,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Method(id) => write!(f, "method 0x{id:02X}"),
            Opcode::Register(reg) => write!(f, "ec 0x{reg:02X}"),
        }
    }
}

/// Whether the caller consumes the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Result is returned to the caller (register read, method query)
    RequestResponse,
    /// Result is discarded (register write, most backlight commands)
    FireAndForget,
}

/// One firmware or EC transaction. Built per call and consumed by
/// [`Transport::execute`](crate::Transport::execute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCommand {
    pub opcode: Opcode,
    pub argument: u32,
    pub direction: Direction,
}

impl DeviceCommand {
    /// Firmware method call whose 32-bit result is wanted
    pub fn query(method: u8, argument: u32) -> Self {
        Self {
            opcode: Opcode::Method(method),
            argument,
            direction: Direction::RequestResponse,
        }
    }

    /// Firmware method call whose result is ignored
    pub fn send(method: u8, argument: u32) -> Self {
        Self {
            opcode: Opcode::Method(method),
            argument,
            direction: Direction::FireAndForget,
        }
    }

    pub fn ec_read(register: u8) -> Self {
        Self {
            opcode: Opcode::Register(register),
            argument: 0,
            direction: Direction::RequestResponse,
        }
    }

    pub fn ec_write(register: u8, value: u8) -> Self {
        Self {
            opcode: Opcode::Register(register),
            argument: value as u32,
            direction: Direction::FireAndForget,
        }
    }

    /// True for an EC register write
    pub fn is_register_write(&self) -> bool {
        matches!(self.opcode, Opcode::Register(_)) && self.direction == Direction::FireAndForget
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.opcode, self.direction) {
            (Opcode::Register(_), Direction::RequestResponse) => write!(f, "{} read", self.opcode),
            (Opcode::Register(_), Direction::FireAndForget) => {
                write!(f, "{} <- 0x{:02X}", self.opcode, self.argument & 0xFF)
            }
            (Opcode::Method(_), _) => write!(f, "{}(0x{:08X})", self.opcode, self.argument),
        }
    }
}

/// Identification of an opened transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportInfo {
    pub bus: BusKind,
    /// Device path or identifier (bus-specific)
    pub path: String,
}
