//! Firmware method calls through the `acpi_call` proc interface
//!
//! The `WMBB` ACPI method is evaluated as `WMBB(instance, method_id, buffer)`
//! where the buffer carries the 32-bit argument little-endian. `acpi_call`
//! answers with `0x<hex>` for integer results, `Error: ...` on failure, or a
//! buffer/string dump for anything else.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::trace;

use crate::error::TransportError;
use crate::protocol::paths;
use crate::types::{BusKind, DeviceCommand, Direction, Opcode, TransportInfo};
use crate::Transport;

/// WMI `WMBB` caller backed by `/proc/acpi/call`
pub struct AcpiCallWmi {
    proc_path: PathBuf,
    method_path: String,
    info: TransportInfo,
    // acpi_call keeps one pending result per file, so write+read must not interleave
    call_lock: Mutex<()>,
}

impl AcpiCallWmi {
    /// Use the default proc file and ACPI method path
    pub fn new() -> Self {
        Self::with_paths(paths::ACPI_CALL, paths::WMBB_METHOD)
    }

    pub fn with_paths(proc_path: impl Into<PathBuf>, method_path: impl Into<String>) -> Self {
        let proc_path = proc_path.into();
        let method_path = method_path.into();
        Self {
            info: TransportInfo {
                bus: BusKind::Wmi,
                path: format!("{}:{}", proc_path.display(), method_path),
            },
            proc_path,
            method_path,
            call_lock: Mutex::new(()),
        }
    }

    /// Open after checking the proc file is present
    pub fn open(proc_path: impl Into<PathBuf>, method_path: impl Into<String>) -> Result<Self, TransportError> {
        let wmi = Self::with_paths(proc_path, method_path);
        if !wmi.proc_path.exists() {
            return Err(TransportError::DeviceNotFound(format!(
                "{} (is the acpi_call module loaded?)",
                wmi.proc_path.display()
            )));
        }
        Ok(wmi)
    }

    fn request_line(&self, method: u8, argument: u32) -> String {
        let [b0, b1, b2, b3] = argument.to_le_bytes();
        format!(
            "{} 0x00 0x{method:02x} b{b0:02x}{b1:02x}{b2:02x}{b3:02x}",
            self.method_path
        )
    }

    fn call(&self, method: u8, argument: u32) -> Result<String, TransportError> {
        let _guard = self.call_lock.lock();
        let path: &Path = &self.proc_path;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| TransportError::io(path, e))?;

        let line = self.request_line(method, argument);
        trace!("acpi_call <- {line}");
        file.write_all(line.as_bytes())
            .map_err(|e| TransportError::io(path, e))?;

        let mut reply = String::new();
        file.read_to_string(&mut reply)
            .map_err(|e| TransportError::io(path, e))?;
        Ok(reply.trim_end_matches('\0').trim().to_string())
    }
}

impl Default for AcpiCallWmi {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an `acpi_call` reply into an integer result.
///
/// `Ok(None)` means the call succeeded but returned a non-integer object.
pub(crate) fn parse_reply(reply: &str) -> Result<Option<u32>, String> {
    if reply.starts_with("Error") {
        return Err(reply.to_string());
    }
    match reply.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16)
            .map(Some)
            .map_err(|_| format!("unparseable integer reply '{reply}'")),
        None => Ok(None),
    }
}

impl Transport for AcpiCallWmi {
    fn execute(&self, command: DeviceCommand) -> Result<u32, TransportError> {
        let Opcode::Method(method) = command.opcode else {
            return Err(TransportError::Unsupported(format!(
                "{command} cannot be sent as a firmware method call"
            )));
        };

        let reply = self.call(method, command.argument)?;
        match parse_reply(&reply) {
            Ok(Some(value)) => Ok(value),
            Ok(None) if command.direction == Direction::FireAndForget => Ok(0),
            Ok(None) => Err(TransportError::InvalidResponse(format!(
                "{command} returned non-integer '{reply}'"
            ))),
            Err(reason) => Err(TransportError::CallFailed {
                opcode: command.opcode.to_string(),
                argument: command.argument,
                reason,
            }),
        }
    }

    fn info(&self) -> &TransportInfo {
        &self.info
    }

    fn is_available(&self) -> bool {
        self.proc_path.exists()
    }
}
