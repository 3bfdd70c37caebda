//! Transport error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    /// Bus interface (proc file, EC device node) is not present
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The firmware rejected the call or the bus reported an error status
    #[error("Call {opcode} (arg 0x{argument:08X}) failed: {reason}")]
    CallFailed {
        opcode: String,
        argument: u32,
        reason: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The channel has no backend for this kind of command
    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            TransportError::DeviceNotFound(path.display().to_string())
        } else {
            TransportError::Io { path, source }
        }
    }
}
