//! Raw EC register access through a seekable byte file
//!
//! `ec_sys` (loaded with `write_support=1`) exposes the 256-byte register
//! space at `/sys/kernel/debug/ec/ec0/io`; `acpi_ec` exposes the same layout
//! at `/dev/ec`. Register N is the byte at offset N.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::TransportError;
use crate::protocol::paths;
use crate::types::{BusKind, DeviceCommand, Direction, Opcode, TransportInfo};
use crate::Transport;

/// EC register bus backed by an open register file
pub struct EcRegisterFile {
    file: Mutex<File>,
    path: PathBuf,
    info: TransportInfo,
}

impl EcRegisterFile {
    /// Open the first usable EC interface: `ec_sys` debugfs, then `/dev/ec`
    pub fn open_default() -> Result<Self, TransportError> {
        Self::open_first(&[paths::EC_SYS_IO, paths::EC_DEV])
    }

    /// Try each candidate path in order
    pub fn open_first<P: AsRef<Path>>(candidates: &[P]) -> Result<Self, TransportError> {
        let mut last_err = None;
        for candidate in candidates {
            match Self::open(candidate.as_ref()) {
                Ok(ec) => return Ok(ec),
                Err(e) => {
                    debug!("EC interface {} unusable: {e}", candidate.as_ref().display());
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            TransportError::DeviceNotFound("no EC interface candidates given".into())
        }))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| TransportError::io(&path, e))?;
        Ok(Self {
            file: Mutex::new(file),
            info: TransportInfo {
                bus: BusKind::Ec,
                path: path.display().to_string(),
            },
            path,
        })
    }

    fn read_byte(&self, register: u8) -> Result<u8, TransportError> {
        let mut file = self.file.lock();
        let mut buf = [0u8; 1];
        file.seek(SeekFrom::Start(register as u64))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|e| TransportError::io(&self.path, e))?;
        Ok(buf[0])
    }

    fn write_byte(&self, register: u8, value: u8) -> Result<(), TransportError> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(register as u64))
            .and_then(|_| file.write_all(&[value]))
            .and_then(|_| file.flush())
            .map_err(|e| TransportError::io(&self.path, e))
    }
}

impl Transport for EcRegisterFile {
    fn execute(&self, command: DeviceCommand) -> Result<u32, TransportError> {
        let Opcode::Register(register) = command.opcode else {
            return Err(TransportError::Unsupported(format!(
                "{command} is not an EC register access"
            )));
        };
        match command.direction {
            Direction::RequestResponse => self.read_byte(register).map(u32::from),
            Direction::FireAndForget => self
                .write_byte(register, (command.argument & 0xFF) as u8)
                .map(|_| 0),
        }
    }

    fn info(&self) -> &TransportInfo {
        &self.info
    }

    fn is_available(&self) -> bool {
        self.path.exists()
    }
}
