//! Transport layer for Clevo XSM keyboard backlight and EC access
//!
//! Every interaction with the laptop firmware is a single synchronous
//! transaction: a firmware method call (`WMBB` method id + 32-bit argument)
//! or a raw EC register read/write. Backends:
//!
//! - [`AcpiCallWmi`]: firmware method calls through the `acpi_call` proc file
//! - [`EcRegisterFile`]: EC registers through `ec_sys` debugfs or `/dev/ec`
//! - [`mock::MockBus`]: recording in-memory bus with failure injection
//!
//! [`DeviceChannel`] routes each command to the bus that serves it and logs
//! every transaction.

pub mod error;
pub mod mock;
pub mod protocol;
pub mod types;

mod channel;
mod ec;
mod wmi;

pub use channel::DeviceChannel;
pub use ec::EcRegisterFile;
pub use error::TransportError;
pub use types::{BusKind, DeviceCommand, Direction, Opcode, TransportInfo};
pub use wmi::AcpiCallWmi;

use std::sync::Arc;

/// The core transport trait - all buses implement this
pub trait Transport: Send + Sync {
    /// Execute one transaction, blocking until the bus answers.
    ///
    /// Fire-and-forget commands return `Ok(0)` on success. Callers must not
    /// assume any hardware state changed when this returns an error.
    fn execute(&self, command: DeviceCommand) -> Result<u32, TransportError>;

    /// Get transport identification
    fn info(&self) -> &TransportInfo;

    /// Whether the bus is present right now
    fn is_available(&self) -> bool {
        true
    }
}

/// Type alias for a shared transport
pub type BoxedTransport = Arc<dyn Transport>;

/// Typed helpers on top of [`Transport::execute`]
pub trait TransportExt {
    /// Call a firmware method and return its 32-bit result
    fn call_method(&self, method: u8, argument: u32) -> Result<u32, TransportError>;

    /// Call a firmware method, discarding the result
    fn send_method(&self, method: u8, argument: u32) -> Result<(), TransportError>;

    fn read_register(&self, register: u8) -> Result<u8, TransportError>;

    fn write_register(&self, register: u8, value: u8) -> Result<(), TransportError>;

    /// Send a backlight argument word via `SET_KB_LED`
    fn set_kb_led(&self, argument: u32) -> Result<(), TransportError> {
        self.send_method(protocol::method::SET_KB_LED, argument)
    }
}

impl<T: Transport + ?Sized> TransportExt for T {
    fn call_method(&self, method: u8, argument: u32) -> Result<u32, TransportError> {
        self.execute(DeviceCommand::query(method, argument))
    }

    fn send_method(&self, method: u8, argument: u32) -> Result<(), TransportError> {
        self.execute(DeviceCommand::send(method, argument)).map(|_| ())
    }

    fn read_register(&self, register: u8) -> Result<u8, TransportError> {
        let value = self.execute(DeviceCommand::ec_read(register))?;
        Ok((value & 0xFF) as u8)
    }

    fn write_register(&self, register: u8, value: u8) -> Result<(), TransportError> {
        self.execute(DeviceCommand::ec_write(register, value))
            .map(|_| ())
    }
}
