//! Keyboard interface error types

use thiserror::Error;
use xsm_transport::TransportError;

/// Errors from backlight and EC operations
#[derive(Error, Debug)]
pub enum KeyboardError {
    /// Bus missing or probe failed; the backlight stays disabled
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A single transaction failed; state was left unchanged
    #[error("Communication failure: {0}")]
    CommunicationFailure(#[from] TransportError),

    /// Rejected before any hardware call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Backlight is powered off")]
    PoweredOff,

    /// Some zones were written, others failed
    #[error("Partial write: {written} zone(s) updated, {failed} failed: {source}")]
    PartialWrite {
        written: usize,
        failed: usize,
        #[source]
        source: TransportError,
    },

    /// Feature not supported by this profile or bus
    #[error("Feature not supported: {0}")]
    NotSupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KeyboardError {
    /// True when the error came from the bus rather than from validation
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            KeyboardError::DeviceUnavailable(_)
                | KeyboardError::CommunicationFailure(_)
                | KeyboardError::PartialWrite { .. }
        )
    }
}
